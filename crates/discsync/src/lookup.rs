//! Ad-hoc catalog queries behind single-flight caches.
//!
//! Every lookup goes through the governed client, so it shares the rate
//! limit with running syncs, and through a per-kind cache, so concurrent
//! callers asking for the same resource pay for one request.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStats, SingleFlightCache};
use crate::entity::list_type::ListType;
use crate::platform::{
    CatalogFetcher, Credentials, LibraryItem, MarketStats, Membership, RateLimitedClient,
    ReleaseDetail, Result, SearchResult, ServiceError,
};

/// Time-to-live per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub search: Duration,
    pub release: Duration,
    pub price: Duration,
    pub membership: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(10 * 60),
            release: Duration::from_secs(60 * 60),
            price: Duration::from_secs(5 * 60),
            membership: Duration::from_secs(5 * 60),
        }
    }
}

/// Counters of every lookup cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub search: CacheStats,
    pub release: CacheStats,
    pub price: CacheStats,
    pub membership: CacheStats,
}

type Cache<V> = SingleFlightCache<String, V, ServiceError>;

/// Cached, governed catalog queries for the current account.
///
/// Cache keys are scoped by username, so disconnecting one account drops
/// only its entries.
pub struct CatalogLookups<F> {
    client: Arc<RateLimitedClient<F>>,
    ttls: CacheTtls,
    searches: Cache<Vec<SearchResult>>,
    releases: Cache<ReleaseDetail>,
    prices: Cache<MarketStats>,
    memberships: Cache<Membership>,
}

impl<F> Clone for CatalogLookups<F> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            ttls: self.ttls,
            searches: self.searches.clone(),
            releases: self.releases.clone(),
            prices: self.prices.clone(),
            memberships: self.memberships.clone(),
        }
    }
}

fn membership_key(prefix: &str, list_type: ListType, release_id: u64) -> String {
    format!("{prefix}{list_type}/{release_id}")
}

impl<F> CatalogLookups<F>
where
    F: CatalogFetcher + 'static,
{
    pub fn new(client: Arc<RateLimitedClient<F>>, ttls: CacheTtls) -> Self {
        Self {
            client,
            ttls,
            searches: SingleFlightCache::new(),
            releases: SingleFlightCache::new(),
            prices: SingleFlightCache::new(),
            memberships: SingleFlightCache::new(),
        }
    }

    pub fn client(&self) -> &Arc<RateLimitedClient<F>> {
        &self.client
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Key prefix of the current account, or `Unauthenticated`.
    fn account_prefix(&self) -> Result<String> {
        self.client
            .credentials()
            .current()
            .map(|creds| format!("{}/", creds.username))
            .ok_or(ServiceError::Unauthenticated)
    }

    /// Drop the account's cached data when the service rejected it.
    fn forget_on_auth_failure<T>(&self, prefix: &str, result: Result<T>) -> Result<T> {
        if matches!(result, Err(ServiceError::Unauthenticated)) {
            self.clear_account(prefix);
        }
        result
    }

    fn clear_account(&self, prefix: &str) -> usize {
        self.searches.invalidate_all(prefix)
            + self.releases.invalidate_all(prefix)
            + self.prices.invalidate_all(prefix)
            + self.memberships.invalidate_all(prefix)
    }

    /// Search releases. Blank queries return nothing without a request.
    pub async fn search(&self, query: &str, force_refresh: bool) -> Result<Vec<SearchResult>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let prefix = self.account_prefix()?;
        let key = format!("{prefix}search/{}", query.to_lowercase());
        let client = Arc::clone(&self.client);
        let result = self
            .searches
            .get_or_fetch(key, self.ttls.search, force_refresh, move || async move {
                client.search(&query).await
            })
            .await;
        self.forget_on_auth_failure(&prefix, result)
    }

    /// Full release detail.
    pub async fn release(&self, release_id: u64, force_refresh: bool) -> Result<ReleaseDetail> {
        let prefix = self.account_prefix()?;
        let key = format!("{prefix}release/{release_id}");
        let client = Arc::clone(&self.client);
        let result = self
            .releases
            .get_or_fetch(key, self.ttls.release, force_refresh, move || async move {
                client.release(release_id).await
            })
            .await;
        self.forget_on_auth_failure(&prefix, result)
    }

    /// Marketplace price statistics.
    pub async fn market_stats(&self, release_id: u64, force_refresh: bool) -> Result<MarketStats> {
        let prefix = self.account_prefix()?;
        let key = format!("{prefix}price/{release_id}");
        let client = Arc::clone(&self.client);
        let result = self
            .prices
            .get_or_fetch(key, self.ttls.price, force_refresh, move || async move {
                client.market_stats(release_id).await
            })
            .await;
        self.forget_on_auth_failure(&prefix, result)
    }

    /// Whether `release_id` is on the given list.
    pub async fn membership(
        &self,
        list_type: ListType,
        release_id: u64,
        force_refresh: bool,
    ) -> Result<Membership> {
        let prefix = self.account_prefix()?;
        let key = membership_key(&prefix, list_type, release_id);
        let client = Arc::clone(&self.client);
        let result = self
            .memberships
            .get_or_fetch(
                key,
                self.ttls.membership,
                force_refresh,
                move || async move { client.membership(list_type, release_id).await },
            )
            .await;
        self.forget_on_auth_failure(&prefix, result)
    }

    /// Add a release to a list and keep the cached membership consistent.
    pub async fn add_to_list(&self, list_type: ListType, release_id: u64) -> Result<LibraryItem> {
        let prefix = self.account_prefix()?;
        let result = self.client.add_to_list(list_type, release_id).await;
        let item = self.forget_on_auth_failure(&prefix, result)?;

        let key = membership_key(&prefix, list_type, release_id);
        match self.memberships.get(&key) {
            Some(mut membership) => {
                if let Some(instance_id) = item.instance_id {
                    membership.instance_ids.push(instance_id);
                }
                membership.present = true;
                self.memberships
                    .update(key, membership, self.ttls.membership);
            }
            None if !list_type.has_instances() => {
                let membership =
                    Membership::from_items(list_type, release_id, std::slice::from_ref(&item));
                self.memberships
                    .update(key, membership, self.ttls.membership);
            }
            // Other copies may exist; let the next read ask the service.
            None => self.memberships.invalidate(&key),
        }

        tracing::debug!(%list_type, release_id, "Added release to list");
        Ok(item)
    }

    /// Remove a release (or, for collections, one copy given as
    /// `(folder_id, instance_id)`) and keep the cached membership consistent.
    pub async fn remove_from_list(
        &self,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> Result<()> {
        let prefix = self.account_prefix()?;
        let result = self
            .client
            .remove_from_list(list_type, release_id, instance)
            .await;
        self.forget_on_auth_failure(&prefix, result)?;

        let key = membership_key(&prefix, list_type, release_id);
        match (instance, self.memberships.get(&key)) {
            (Some((_, instance_id)), Some(mut membership)) => {
                membership.instance_ids.retain(|&id| id != instance_id);
                membership.present = !membership.instance_ids.is_empty();
                self.memberships
                    .update(key, membership, self.ttls.membership);
            }
            (None, _) if !list_type.has_instances() => {
                self.memberships.update(
                    key,
                    Membership::absent(list_type, release_id),
                    self.ttls.membership,
                );
            }
            _ => self.memberships.invalidate(&key),
        }

        tracing::debug!(%list_type, release_id, "Removed release from list");
        Ok(())
    }

    /// Install credentials for an account.
    pub fn connect(&self, credentials: Credentials) {
        tracing::info!(username = %credentials.username, "Connected account");
        self.client.credentials().restore(credentials);
    }

    /// Forget the current account and every cached lookup made for it.
    pub fn disconnect(&self) {
        if let Ok(prefix) = self.account_prefix() {
            let removed = self.clear_account(&prefix);
            tracing::info!(removed, "Disconnected account");
        }
        self.client.credentials().invalidate();
    }

    /// Drop expired entries from every cache.
    pub fn purge_expired(&self) -> usize {
        self.searches.purge_expired()
            + self.releases.purge_expired()
            + self.prices.purge_expired()
            + self.memberships.purge_expired()
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            search: self.searches.stats(),
            release: self.releases.stats(),
            price: self.prices.stats(),
            membership: self.memberships.stats(),
        }
    }
}
