use discsync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::SyncStarted { list_type } => {
                tracing::info!(%list_type, "Syncing list");
            }

            SyncProgress::FetchedPage {
                list_type,
                page,
                total_pages,
                count,
                total_so_far,
                total_expected,
            } => {
                tracing::info!(
                    %list_type,
                    page,
                    total_pages,
                    count,
                    total_so_far,
                    total_expected,
                    "Fetched page"
                );
            }

            SyncProgress::PageRetry {
                list_type,
                page,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    %list_type,
                    page,
                    retry_after_ms,
                    attempt,
                    "Rate limited, backing off"
                );
            }

            SyncProgress::Swept { list_type, removed } => {
                tracing::debug!(%list_type, removed, "Removed stale entries");
            }

            SyncProgress::SyncComplete {
                list_type,
                items,
                removed,
            } => {
                tracing::info!(%list_type, items, removed, "Sync complete");
            }

            SyncProgress::SyncSuperseded { list_type } => {
                tracing::warn!(%list_type, "Sync superseded");
            }

            SyncProgress::SyncFailed { list_type, error } => {
                tracing::error!(%list_type, error = %error, "Sync failed");
            }

            _ => {}
        }
    }
}
