//! `discsync sync`: mirror remote lists into the local database.

use std::sync::Arc;

use console::style;
use discsync::{Reconciler, SqlRecordStore, SyncError, connect_and_migrate};

use crate::commands::shared::{CliResult, ListArg, build_client};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown;

pub(crate) async fn handle_sync(list: ListArg, config: &Config, database_url: &str) -> CliResult {
    let client = build_client(config)?;
    let db = connect_and_migrate(database_url).await?;
    let store = Arc::new(SqlRecordStore::new(db));
    let reconciler = Reconciler::new(client, store, config.sync_options());

    shutdown::setup_shutdown_handler(Arc::clone(reconciler.sessions()));

    let reporter = Arc::new(ProgressReporter::new());
    let on_progress = reporter.as_callback();
    let results = reconciler
        .sync_lists(&list.list_types(), None, Some(&on_progress))
        .await;
    reporter.finish();

    let mut failed = 0usize;
    println!();
    for (list_type, result) in &results {
        match result {
            Ok(summary) => println!(
                "{} {}: {} items across {} pages, {} removed",
                style("✓").green().bold(),
                style(list_type).cyan(),
                summary.items_fetched,
                summary.pages_fetched,
                summary.swept,
            ),
            Err(SyncError::Superseded { .. }) => println!(
                "{} {}: stopped before completion, nothing removed",
                style("⚠").yellow().bold(),
                style(list_type).cyan(),
            ),
            Err(e) => {
                failed += 1;
                println!(
                    "{} {}: {}",
                    style("✗").red().bold(),
                    style(list_type).cyan(),
                    e
                );
            }
        }
    }

    if results.iter().any(|(_, r)| r.as_ref().is_err_and(SyncError::is_unauthenticated)) {
        eprintln!(
            "{} the catalog rejected the configured token",
            style("Hint:").yellow().bold()
        );
    }

    if failed > 0 {
        return Err(format!("{failed} of {} list syncs failed", results.len()).into());
    }
    Ok(())
}
