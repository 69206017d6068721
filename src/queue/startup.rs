use std::path::Path;

use crate::app::AppState;
use crate::error::Result;
use crate::queue::task::{Task, TaskOrigin};
use crate::scan;

/// Enqueue files already sitting in the watched folder.
///
/// Files dropped in while the processor was not running would otherwise
/// never produce a create event.
pub async fn enqueue_existing_files(state: &AppState, watch_dir: &Path) -> Result<usize> {
    tracing::info!(dir = %watch_dir.display(), "Scanning for files already present...");

    let files = scan::list_input_files(watch_dir).await?;

    let mut file_queue = state.file_queue.write().await;
    let mut added = 0;
    for path in files {
        if file_queue.enqueue(Task::new(path, TaskOrigin::Scan)) {
            added += 1;
        }
    }

    tracing::info!(count = added, "Startup scan complete");
    Ok(added)
}
