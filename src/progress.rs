//! Progress UI (spinner) for upload runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use uploader_core::{UploadEngine, UploadStatus};

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    engine: UploadEngine,
    total: usize,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(engine, total, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    engine: UploadEngine,
    total: usize,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            let items = engine.items();
            let settled = items
                .iter()
                .filter(|item| item.status.is_settled())
                .count();
            let active = items
                .iter()
                .find(|item| item.status == UploadStatus::Uploading);

            let message = match active {
                Some(item) => format!(
                    "[{}/{}] Uploading {} ({}%)...",
                    (settled + 1).min(total),
                    total,
                    item.title,
                    item.progress
                ),
                None => format!("[{}/{}] Waiting...", settled.min(total), total),
            };
            spinner.set_message(message);
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}
