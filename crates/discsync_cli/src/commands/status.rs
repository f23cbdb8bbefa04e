//! `discsync status`: show what the local database holds.

use console::style;
use discsync::{ListType, RecordStore, SqlRecordStore, connect_and_migrate};

use crate::commands::shared::CliResult;

pub(crate) async fn handle_status(database_url: &str) -> CliResult {
    let db = connect_and_migrate(database_url).await?;
    let store = SqlRecordStore::new(db);

    for list_type in ListType::ALL {
        let count = store.count_for(list_type).await?;
        let last_sync = match store.sync_state(list_type).await? {
            Some(state) => format!(
                "last synced {}",
                state.last_refreshed_at.format("%Y-%m-%d %H:%M:%S %:z")
            ),
            None => "never synced".to_string(),
        };
        println!(
            "{:<12} {:>6} entries  {}",
            style(list_type).cyan(),
            count,
            style(last_sync).dim()
        );
    }
    Ok(())
}
