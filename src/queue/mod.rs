pub mod startup;
pub mod task;

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::app::AppState;
use crate::pipeline;
use crate::types::RunSummary;

use task::Task;

/// Unbounded FIFO of files waiting to be processed.
///
/// A path is held at most once while pending, so a burst of events for the
/// same file does not process it twice.
pub struct FileQueue {
    pending: VecDeque<Task>,
    queued: HashSet<PathBuf>,
    /// Notification channel for the processor.
    notify: Option<mpsc::UnboundedSender<()>>,
}

impl Default for FileQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FileQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            notify: None,
        }
    }

    pub fn set_notifier(&mut self, tx: mpsc::UnboundedSender<()>) {
        self.notify = Some(tx);
    }

    /// Queue a task. Returns `false` if the path is already pending.
    pub fn enqueue(&mut self, task: Task) -> bool {
        if !self.queued.insert(task.path.clone()) {
            tracing::debug!(task = %task.description(), "Already queued, skipping");
            return false;
        }

        tracing::debug!(task = %task.description(), "Enqueuing task");
        self.pending.push_back(task);

        if let Some(ref tx) = self.notify {
            let _ = tx.send(());
        }
        true
    }

    pub fn take_next(&mut self) -> Option<Task> {
        let task = self.pending.pop_front()?;
        self.queued.remove(&task.path);
        Some(task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.queued.clear();
    }
}

/// Process every queued file, one at a time.
pub async fn drain_queue(state: &AppState) -> RunSummary {
    drain_until(state, || false).await
}

/// Like [`drain_queue`], but `should_stop` is checked before each file.
/// The file in progress always completes.
pub async fn drain_until<F>(state: &AppState, should_stop: F) -> RunSummary
where
    F: Fn() -> bool,
{
    let mut summary = RunSummary::default();

    loop {
        if should_stop() {
            break;
        }

        let task = {
            let mut file_queue = state.file_queue.write().await;
            file_queue.take_next()
        };

        let task = match task {
            Some(t) => t,
            None => break,
        };

        // Watch events can trail a start-up scan that already moved the file.
        if !tokio::fs::try_exists(&task.path).await.unwrap_or(true) {
            tracing::debug!(task = %task.description(), "File no longer present, skipping");
            continue;
        }

        tracing::info!(task = %task.description(), "Processing task");

        match pipeline::process_file(state, &task.path).await {
            Ok(report) => summary.record(&report),
            Err(e) => {
                tracing::error!(
                    task = %task.description(),
                    error = %e,
                    "Task failed"
                );
                summary.record_error();
            }
        }
    }

    summary
}

/// Run the background queue processor until `shutdown` flips to `true`.
pub async fn run_queue_processor(
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    {
        let mut file_queue = state.file_queue.write().await;
        file_queue.set_notifier(tx);
    }

    tracing::info!("Queue processor started");

    let mut summary = RunSummary::default();

    loop {
        // Work queued before the notifier existed is picked up here too.
        let stop = shutdown.clone();
        let batch = drain_until(&state, move || *stop.borrow()).await;
        summary.merge(&batch);

        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            msg = rx.recv() => {
                if msg.is_none() {
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Queue processor stopped");
    summary
}
