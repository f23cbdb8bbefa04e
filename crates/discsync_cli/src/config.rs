//! Configuration file support for discsync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `DISCSYNC_`, sections separated
//!    by `__`, e.g. `DISCSYNC_CATALOG__TOKEN`)
//! 3. Config file (./discsync.toml, then ~/.config/discsync/config.toml)
//! 4. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/discsync/discsync.db"  # optional, this is the default
//!
//! [catalog]
//! username = "alice"
//! token = "..."        # or DISCSYNC_CATALOG__TOKEN
//! user_agent = "discsync/0.1 +https://example.com"
//!
//! [rate_limit]
//! requests_per_minute = 60
//! burst = 3
//!
//! [cache]
//! search_ttl_secs = 600
//! release_ttl_secs = 3600
//! price_ttl_secs = 300
//! membership_ttl_secs = 300
//!
//! [sync]
//! per_page = 100
//! max_rate_limit_attempts = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use discsync::lookup::CacheTtls;
use discsync::platform::{Credentials, RateLimitConfig, rate_limits};
use discsync::remote::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use discsync::sync::{DEFAULT_PER_PAGE, MAX_RATE_LIMIT_ATTEMPTS, SyncOptions};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub catalog: CatalogConfig,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (sqlite:// or postgres://).
    /// Defaults to `discsync.db` in the XDG state directory.
    pub url: Option<String>,
}

/// Catalog service account and endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub username: Option<String>,
    /// Personal access token.
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Request budget for the catalog service.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: rate_limits::CATALOG_REQUESTS_PER_MINUTE,
            burst: rate_limits::CATALOG_BURST,
        }
    }
}

/// Lookup cache TTLs, in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub search_ttl_secs: u64,
    pub release_ttl_secs: u64,
    pub price_ttl_secs: u64,
    pub membership_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttls = CacheTtls::default();
        Self {
            search_ttl_secs: ttls.search.as_secs(),
            release_ttl_secs: ttls.release.as_secs(),
            price_ttl_secs: ttls.price.as_secs(),
            membership_ttl_secs: ttls.membership.as_secs(),
        }
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub per_page: u32,
    pub max_rate_limit_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_rate_limit_attempts: MAX_RATE_LIMIT_ATTEMPTS,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/discsync/config.toml)
    /// 3. Local config file (./discsync.toml)
    /// 4. Environment variables with DISCSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("discsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./discsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(env_source());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// `mode=rwc` creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("discsync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Account credentials, when both username and token are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.catalog.username, &self.catalog.token) {
            (Some(username), Some(token)) if !username.is_empty() && !token.is_empty() => {
                Some(Credentials::new(username.clone(), token.clone()))
            }
            _ => None,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::per_minute(
            self.rate_limit.requests_per_minute,
            self.rate_limit.burst,
        )
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            search: Duration::from_secs(self.cache.search_ttl_secs),
            release: Duration::from_secs(self.cache.release_ttl_secs),
            price: Duration::from_secs(self.cache.price_ttl_secs),
            membership: Duration::from_secs(self.cache.membership_ttl_secs),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            per_page: self.sync.per_page.max(1),
            max_rate_limit_attempts: self.sync.max_rate_limit_attempts.max(1),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "discsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/discsync` or `~/.local/state/discsync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "discsync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("DISCSYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
