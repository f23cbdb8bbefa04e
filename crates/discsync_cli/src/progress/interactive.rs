use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use discsync::ListType;
use discsync::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Interactive progress reporter using indicatif.
///
/// One bar per list; it starts as a spinner and becomes a page bar once the
/// first page reports the page count.
pub struct InteractiveReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<ListType, ProgressBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::SyncStarted { list_type } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_prefix(format!("{:10}", list_type));
                bar.set_message("Fetching first page...");
                if let Some(old) = bars.insert(list_type, bar) {
                    old.finish_and_clear();
                }
            }

            SyncProgress::FetchedPage {
                list_type,
                page,
                total_pages,
                total_so_far,
                total_expected,
                ..
            } => {
                if let Some(bar) = bars.get(&list_type) {
                    if bar.length() != Some(u64::from(total_pages)) {
                        bar.set_style(bar_style());
                        bar.set_length(u64::from(total_pages));
                    }
                    bar.set_position(u64::from(page));
                    bar.set_message(format!("{total_so_far}/{total_expected} items"));
                }
            }

            SyncProgress::PageRetry {
                list_type,
                page,
                retry_after_ms,
                attempt,
            } => {
                if let Some(bar) = bars.get(&list_type) {
                    bar.set_message(format!(
                        "rate limited on page {page}, retrying in {:.1}s (attempt {attempt})",
                        retry_after_ms as f64 / 1000.0
                    ));
                }
            }

            SyncProgress::Swept { list_type, removed } => {
                if let Some(bar) = bars.get(&list_type) {
                    bar.set_message(format!("removed {removed} stale entries"));
                }
            }

            SyncProgress::SyncComplete {
                list_type,
                items,
                removed,
            } => {
                if let Some(bar) = bars.get(&list_type) {
                    bar.finish_with_message(format!("{items} items, {removed} removed"));
                }
            }

            SyncProgress::SyncSuperseded { list_type } => {
                if let Some(bar) = bars.get(&list_type) {
                    bar.abandon_with_message("superseded");
                }
            }

            SyncProgress::SyncFailed { list_type, error } => {
                if let Some(bar) = bars.get(&list_type) {
                    bar.abandon_with_message(format!("failed: {error}"));
                }
            }

            _ => {}
        }
    }

    /// Finish any bar still running.
    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for bar in bars.values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}
