//! discsync CLI - mirror a catalog collection and wantlist locally.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use discsync::ListType;
use tracing_subscriber::EnvFilter;

use crate::commands::lookup::parse_instance;
use crate::commands::shared::ListArg;

#[derive(Parser)]
#[command(name = "discsync")]
#[command(version)]
#[command(about = "Mirror a catalog collection and wantlist into a local database")]
#[command(after_long_help = r#"EXAMPLES
    Sync both lists:
        $ discsync sync

    Sync only the wantlist:
        $ discsync sync wantlist

    Check whether you own a release:
        $ discsync owns 249504

CONFIGURATION
    discsync reads configuration from:
      1. ~/.config/discsync/config.toml (or $XDG_CONFIG_HOME/discsync/config.toml)
      2. ./discsync.toml
      3. Environment variables (DISCSYNC_ prefix, sections separated by __)

ENVIRONMENT VARIABLES
    DISCSYNC_DATABASE__URL        Database connection string
    DISCSYNC_CATALOG__USERNAME    Catalog account name
    DISCSYNC_CATALOG__TOKEN       Personal access token
    DISCSYNC_RATE_LIMIT__REQUESTS_PER_MINUTE
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync remote lists into the local database
    Sync {
        /// Which list to sync
        #[arg(value_enum, default_value_t = ListArg::All)]
        list: ListArg,
    },
    /// Show local entry counts and last sync times
    Status,
    /// Show release detail
    Release {
        /// Release id
        id: u64,
    },
    /// Check whether a release is in your collection or wantlist
    Owns {
        /// Release id
        id: u64,

        /// Which list to check
        #[arg(short, long, value_enum, default_value_t = ListArg::All)]
        list: ListArg,
    },
    /// Search the catalog for releases
    Search {
        /// Search terms
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show marketplace price statistics for a release
    Prices {
        /// Release id
        id: u64,
    },
    /// Add a release to a list
    Add {
        /// Release id
        id: u64,

        #[arg(short, long, value_parser = parse_list_type, default_value = "wantlist")]
        list: ListType,
    },
    /// Remove a release from a list
    Remove {
        /// Release id
        id: u64,

        #[arg(short, long, value_parser = parse_list_type, default_value = "wantlist")]
        list: ListType,

        /// Collection copy to remove, as FOLDER:INSTANCE
        #[arg(short, long, value_parser = parse_instance)]
        instance: Option<(u64, u64)>,
    },
}

fn parse_list_type(value: &str) -> Result<ListType, String> {
    value.parse().map_err(|_| {
        format!("unknown list {value:?} (expected \"collection\" or \"wantlist\")")
    })
}

/// Create the parent directory of a SQLite database file.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured logging only when not attached to a TTY; progress bars otherwise
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("discsync=info,discsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync { list } => {
            let database_url = database_url(&config)?;
            commands::sync::handle_sync(list, &config, &database_url).await?;
        }
        Commands::Status => {
            let database_url = database_url(&config)?;
            commands::status::handle_status(&database_url).await?;
        }
        Commands::Release { id } => commands::lookup::handle_release(id, &config).await?,
        Commands::Owns { id, list } => commands::lookup::handle_owns(id, list, &config).await?,
        Commands::Search { query } => {
            commands::lookup::handle_search(&query.join(" "), &config).await?;
        }
        Commands::Prices { id } => commands::lookup::handle_prices(id, &config).await?,
        Commands::Add { id, list } => commands::lookup::handle_add(id, list, &config).await?,
        Commands::Remove { id, list, instance } => {
            commands::lookup::handle_remove(id, list, instance, &config).await?;
        }
    }

    Ok(())
}

fn database_url(config: &config::Config) -> Result<String, Box<dyn std::error::Error>> {
    let database_url = config
        .database_url()
        .ok_or("Could not determine a database location; set [database] url")?;
    ensure_sqlite_dir(&database_url)?;
    Ok(database_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_defaults_to_all_lists() {
        let cli = Cli::try_parse_from(["discsync", "sync"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { list: ListArg::All }));

        let cli = Cli::try_parse_from(["discsync", "sync", "wantlist"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync {
                list: ListArg::Wantlist
            }
        ));
    }

    #[test]
    fn test_remove_parses_instance() {
        let cli = Cli::try_parse_from([
            "discsync",
            "remove",
            "42",
            "--list",
            "collection",
            "--instance",
            "1:900",
        ])
        .unwrap();
        match cli.command {
            Commands::Remove { id, list, instance } => {
                assert_eq!(id, 42);
                assert_eq!(list, ListType::Collection);
                assert_eq!(instance, Some((1, 900)));
            }
            _ => panic!("expected remove"),
        }
    }

    #[test]
    fn test_search_joins_terms() {
        let cli = Cli::try_parse_from(["discsync", "search", "boards", "of", "canada"]).unwrap();
        match cli.command {
            Commands::Search { query } => assert_eq!(query.join(" "), "boards of canada"),
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_unknown_list_rejected() {
        assert!(Cli::try_parse_from(["discsync", "add", "1", "--list", "crates"]).is_err());
    }

    #[test]
    fn test_ensure_sqlite_dir_ignores_other_schemes() {
        assert!(ensure_sqlite_dir("postgres://localhost/db").is_ok());
    }
}
