use std::sync::Arc;

use console::Term;
use discsync::ListType;
use discsync::sync::SessionRegistry;

/// Set up the Ctrl+C handler.
///
/// The first Ctrl+C cancels every running sync session; sessions stop at
/// their next page boundary and delete nothing. A second Ctrl+C exits
/// immediately.
pub(crate) fn setup_shutdown_handler(sessions: Arc<SessionRegistry>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, stopping after the current page...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, stopping after the current page");
        }

        for list_type in ListType::ALL {
            sessions.cancel(list_type);
        }

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
