use std::sync::Arc;

use clap::ValueEnum;
use discsync::{CatalogClient, CredentialStore, ListType, RateLimitedClient, RateLimiter};

use crate::config::Config;

pub(crate) type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// The governed catalog client used by every networked command.
pub(crate) type Client = RateLimitedClient<CatalogClient>;

/// List selection accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ListArg {
    Collection,
    Wantlist,
    All,
}

impl ListArg {
    pub(crate) fn list_types(self) -> Vec<ListType> {
        match self {
            ListArg::Collection => vec![ListType::Collection],
            ListArg::Wantlist => vec![ListType::Wantlist],
            ListArg::All => ListType::ALL.to_vec(),
        }
    }
}

/// Build the rate-limited catalog client from configuration.
///
/// Fails when no credentials are configured; every catalog endpoint the
/// CLI uses is account-scoped.
pub(crate) fn build_client(config: &Config) -> CliResult<Arc<Client>> {
    let credentials = config.credentials().ok_or(
        "No catalog credentials configured. Set [catalog] username and token in \
         the config file, or DISCSYNC_CATALOG__USERNAME and DISCSYNC_CATALOG__TOKEN.",
    )?;

    let catalog = CatalogClient::new(&config.catalog.base_url, &config.catalog.user_agent)?;
    let limiter = RateLimiter::new(config.rate_limit_config());
    let client = RateLimitedClient::new(
        catalog,
        limiter,
        CredentialStore::with_credentials(credentials),
    )
    .with_max_attempts(config.sync.max_rate_limit_attempts.max(1));

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_arg_expands() {
        assert_eq!(ListArg::Collection.list_types(), vec![ListType::Collection]);
        assert_eq!(
            ListArg::All.list_types(),
            vec![ListType::Collection, ListType::Wantlist]
        );
    }

    #[test]
    fn test_build_client_requires_credentials() {
        let config = Config::default();
        let err = build_client(&config).err().expect("missing credentials");
        assert!(err.to_string().contains("No catalog credentials"));
    }
}
