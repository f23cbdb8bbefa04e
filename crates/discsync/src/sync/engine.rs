//! Paginated mark-and-sweep reconciler.
//!
//! A sync session walks a remote list page by page, upserting every item it
//! sees. Only when the server reports the final page does the session delete
//! local entries it did not see. A failed or superseded session leaves
//! whatever it already upserted and deletes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::entity::entry_key::EntryKey;
use crate::entity::library_entry;
use crate::entity::list_type::ListType;
use crate::platform::{
    BackoffNotify, CatalogFetcher, LibraryItem, RateLimitedClient, RetryGate, RetryHooks,
    short_error_message,
};
use crate::store::RecordStore;

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::session::{SessionId, SessionRegistry};
use super::types::{PageMeta, Result, SyncError, SyncOptions, SyncSummary};

/// Callback invoked after each page has been applied to the store.
pub type PageCallback<'a> = dyn Fn(&[LibraryItem], &PageMeta) + Send + Sync + 'a;

/// Position of the `index`-th item of `page` in the whole list.
#[inline]
pub fn item_position(page: u32, per_page: u32, index: usize) -> i32 {
    let position = u64::from(page.saturating_sub(1)) * u64::from(per_page) + index as u64;
    i32::try_from(position).unwrap_or(i32::MAX)
}

/// Drives list syncs against a governed client and a record store.
///
/// # Example
///
/// ```ignore
/// use discsync::sync::{Reconciler, SyncOptions};
///
/// let reconciler = Reconciler::new(client, store, SyncOptions::default());
/// let summary = reconciler.sync(ListType::Collection, None, None).await?;
/// println!("{} items, {} removed", summary.items_fetched, summary.swept);
/// ```
pub struct Reconciler<F, S> {
    client: Arc<RateLimitedClient<F>>,
    store: Arc<S>,
    sessions: Arc<SessionRegistry>,
    options: SyncOptions,
}

impl<F, S> Clone for Reconciler<F, S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            sessions: Arc::clone(&self.sessions),
            options: self.options.clone(),
        }
    }
}

impl<F, S> Reconciler<F, S>
where
    F: CatalogFetcher,
    S: RecordStore,
{
    pub fn new(client: Arc<RateLimitedClient<F>>, store: Arc<S>, options: SyncOptions) -> Self {
        Self {
            client,
            store,
            sessions: Arc::new(SessionRegistry::new()),
            options,
        }
    }

    /// Share an existing session registry (for several reconcilers over one store).
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = sessions;
        self
    }

    /// The session registry; beginning a session on it supersedes this
    /// reconciler's running session of the same list type.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn client(&self) -> &Arc<RateLimitedClient<F>> {
        &self.client
    }

    /// Sync one list, superseding any session already running for it.
    ///
    /// # Errors
    /// - [`SyncError::Service`] for the first fetch failure that could not be
    ///   retried (including exhausted rate-limit retries and auth rejections).
    /// - [`SyncError::Store`] when writing to the store fails.
    /// - [`SyncError::Superseded`] when a newer session took over.
    pub async fn sync(
        &self,
        list_type: ListType,
        on_page: Option<&PageCallback<'_>>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<SyncSummary> {
        let session = self.sessions.begin(list_type);
        tracing::info!(%list_type, %session, "Starting sync");
        emit(on_progress, SyncProgress::SyncStarted { list_type });

        let result = self
            .run_session(list_type, session, on_page, on_progress)
            .await;
        self.sessions.finish(list_type, session);

        match &result {
            Ok(summary) => {
                tracing::info!(
                    %list_type,
                    pages = summary.pages_fetched,
                    items = summary.items_fetched,
                    swept = summary.swept,
                    "Sync complete"
                );
                emit(
                    on_progress,
                    SyncProgress::SyncComplete {
                        list_type,
                        items: summary.items_fetched,
                        removed: summary.swept,
                    },
                );
            }
            Err(e) if e.is_cancellation() => {
                tracing::warn!(%list_type, %session, "Sync superseded by a newer session");
                emit(on_progress, SyncProgress::SyncSuperseded { list_type });
            }
            Err(e) => {
                tracing::warn!(%list_type, error = %e, "Sync failed");
                emit(
                    on_progress,
                    SyncProgress::SyncFailed {
                        list_type,
                        error: short_error_message(e),
                    },
                );
            }
        }

        result
    }

    /// Sync several lists concurrently, one independent session each.
    ///
    /// Returns one result per requested list type, in request order.
    pub async fn sync_lists(
        &self,
        list_types: &[ListType],
        on_page: Option<&PageCallback<'_>>,
        on_progress: Option<&ProgressCallback>,
    ) -> Vec<(ListType, Result<SyncSummary>)> {
        let syncs = list_types.iter().map(|&list_type| async move {
            (list_type, self.sync(list_type, on_page, on_progress).await)
        });
        futures::future::join_all(syncs).await
    }

    async fn run_session(
        &self,
        list_type: ListType,
        session: SessionId,
        on_page: Option<&PageCallback<'_>>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<SyncSummary> {
        let superseded = || SyncError::Superseded { list_type };

        let mut summary = SyncSummary::new(list_type);
        let mut seen: HashSet<EntryKey> = HashSet::new();
        let mut page = 1u32;

        loop {
            if !self.sessions.is_active(list_type, session) {
                return Err(superseded());
            }

            let notify_page = page;
            let on_backoff = move |attempt: u32, delay: Duration| {
                emit(
                    on_progress,
                    SyncProgress::PageRetry {
                        list_type,
                        page: notify_page,
                        retry_after_ms: delay.as_millis() as u64,
                        attempt,
                    },
                );
            };
            let on_backoff: &BackoffNotify<'_> = &on_backoff;
            let sessions: &SessionRegistry = &self.sessions;
            let keep_retrying = move || sessions.is_active(list_type, session);
            let keep_retrying: &RetryGate<'_> = &keep_retrying;

            let fetched = match self
                .client
                .list_page_with(
                    list_type,
                    page,
                    self.options.per_page,
                    self.options.max_rate_limit_attempts,
                    RetryHooks {
                        on_backoff: Some(on_backoff),
                        keep_retrying: Some(keep_retrying),
                    },
                )
                .await
            {
                Ok(fetched) => fetched,
                Err(_) if !self.sessions.is_active(list_type, session) => {
                    return Err(superseded());
                }
                Err(e) => return Err(e.into()),
            };
            let pagination = fetched.pagination;

            let per_page = if pagination.per_page > 0 {
                pagination.per_page
            } else {
                self.options.per_page
            };
            let now = Utc::now().fixed_offset();
            let entries = dedupe_by_key(fetched.items.iter().enumerate().map(|(index, item)| {
                library_entry::Model::from_item(
                    list_type,
                    item,
                    Some(item_position(page, per_page, index)),
                    now,
                )
            }));
            let keys: Vec<EntryKey> = entries.iter().map(library_entry::Model::key).collect();

            {
                let Some(_writer) = self.sessions.writer(list_type, session).await else {
                    return Err(superseded());
                };
                self.store.upsert_entries(entries).await?;
            }
            seen.extend(keys);

            summary.pages_fetched += 1;
            summary.items_fetched += fetched.items.len() as u64;
            summary.total_pages = pagination.total_pages;
            summary.total_items_expected = pagination.total_items;

            let meta = PageMeta {
                list_type,
                page,
                total_pages: pagination.total_pages,
                items_received: fetched.items.len(),
                total_items_expected: pagination.total_items,
            };
            if let Some(cb) = on_page {
                cb(&fetched.items, &meta);
            }
            emit(
                on_progress,
                SyncProgress::FetchedPage {
                    list_type,
                    page,
                    total_pages: pagination.total_pages,
                    count: fetched.items.len(),
                    total_so_far: summary.items_fetched,
                    total_expected: pagination.total_items,
                },
            );
            tracing::debug!(
                %list_type,
                page,
                total_pages = pagination.total_pages,
                items = fetched.items.len(),
                "Applied page"
            );

            // The latest reported page count wins.
            if page >= pagination.total_pages {
                break;
            }
            page += 1;
        }

        let Some(_writer) = self.sessions.writer(list_type, session).await else {
            return Err(superseded());
        };

        let existing = self.store.keys_for(list_type).await?;
        let stale: Vec<EntryKey> = existing.difference(&seen).copied().collect();
        let swept = self
            .store
            .sweep(
                list_type,
                &stale,
                Utc::now().fixed_offset(),
                seen.len() as u64,
            )
            .await?;

        emit(
            on_progress,
            SyncProgress::Swept {
                list_type,
                removed: swept,
            },
        );

        summary.swept = swept;
        summary.completed = true;
        Ok(summary)
    }
}

/// Collapse repeated keys within one page, keeping the last occurrence.
fn dedupe_by_key(
    entries: impl Iterator<Item = library_entry::Model>,
) -> Vec<library_entry::Model> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, library_entry::Model> = HashMap::new();
    for entry in entries {
        if by_key.insert(entry.entry_key.clone(), entry.clone()).is_none() {
            order.push(entry.entry_key);
        }
    }
    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}
