use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::queue::task::{Task, TaskOrigin};
use crate::queue::{self, startup};
use crate::scan;
use crate::shutdown;
use crate::types::RunSummary;

/// Bounds on how often settling files are re-checked.
const MIN_POLL: Duration = Duration::from_millis(50);
const MAX_POLL: Duration = Duration::from_secs(1);

/// Debounced watcher on one folder. Dropping it stops the watch.
pub struct FolderWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    _settler: JoinHandle<()>,
    path: PathBuf,
}

impl FolderWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Watch `dir` (non-recursively) and send each new file on `tx` once its
/// size and modification time have not changed for `quiet`.
///
/// Must be called from within a tokio runtime.
pub fn start_watcher(
    dir: &Path,
    quiet: Duration,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> Result<FolderWatcher> {
    let watched = dir.to_path_buf();
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut debouncer = new_debouncer(
        quiet.clamp(MIN_POLL, Duration::from_millis(500)),
        None,
        move |result: std::result::Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
            Ok(events) => {
                for event in events {
                    for path in candidate_files(&event.event, &watched) {
                        if raw_tx.send(path).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!(error = %error, "Watcher error");
                }
            }
        },
    )?;

    debouncer.watch(dir, RecursiveMode::NonRecursive)?;

    // Ends when the debouncer, and with it `raw_tx`, is dropped.
    let settler = tokio::spawn(settle(raw_rx, tx, quiet));

    Ok(FolderWatcher {
        _debouncer: debouncer,
        _settler: settler,
        path: dir.to_path_buf(),
    })
}

/// Regular files directly inside `watched` that `event` reports as new or
/// written to. Files moved into the folder count as new.
pub fn candidate_files(event: &Event, watched: &Path) -> Vec<PathBuf> {
    let paths: &[PathBuf] = match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        // Paths are [from, to]; only the destination matters.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(std::slice::from_ref).unwrap_or(&[])
        }
        _ => &[],
    };

    paths
        .iter()
        .filter(|path| path.parent() == Some(watched))
        .filter(|path| {
            path.file_name()
                .map(|n| scan::is_candidate_name(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        // symlink_metadata so symlinks are not followed out of the folder
        .filter(|path| {
            std::fs::symlink_metadata(path)
                .map(|m| m.file_type().is_file())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    len: u64,
    modified: Option<SystemTime>,
}

impl Snapshot {
    fn read(path: &Path) -> Option<Self> {
        let meta = std::fs::symlink_metadata(path).ok()?;
        if !meta.file_type().is_file() {
            return None;
        }
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct Settling {
    snapshot: Snapshot,
    stable_since: Instant,
}

/// Files seen by the watcher that are not yet known to be fully written.
///
/// A file is settled once its size and modification time have stayed the
/// same for the quiet period. Any event or observed change restarts it.
pub struct SettlingFiles {
    quiet: Duration,
    pending: HashMap<PathBuf, Settling>,
}

impl SettlingFiles {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    /// Record activity on `path`, restarting its quiet period.
    pub fn observe(&mut self, path: PathBuf, now: Instant) {
        match Snapshot::read(&path) {
            Some(snapshot) => {
                self.pending.insert(
                    path,
                    Settling {
                        snapshot,
                        stable_since: now,
                    },
                );
            }
            None => {
                self.pending.remove(&path);
            }
        }
    }

    /// Remove and return every file that has been quiet long enough.
    /// Files that vanished are dropped.
    pub fn take_settled(&mut self, now: Instant) -> Vec<PathBuf> {
        let quiet = self.quiet;
        let mut settled = Vec::new();

        self.pending.retain(|path, entry| {
            let Some(snapshot) = Snapshot::read(path) else {
                tracing::debug!(file = %path.display(), "File vanished before settling");
                return false;
            };
            if snapshot != entry.snapshot {
                entry.snapshot = snapshot;
                entry.stable_since = now;
                return true;
            }
            if now.saturating_duration_since(entry.stable_since) >= quiet {
                settled.push(path.clone());
                return false;
            }
            true
        });

        settled.sort();
        settled
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn poll_interval(quiet: Duration) -> Duration {
    (quiet / 4).clamp(MIN_POLL, MAX_POLL)
}

/// Hold raw watcher paths until they settle, then pass them to `tx`.
async fn settle(
    mut raw_rx: mpsc::UnboundedReceiver<PathBuf>,
    tx: mpsc::UnboundedSender<PathBuf>,
    quiet: Duration,
) {
    let mut files = SettlingFiles::new(quiet);
    let mut ticker = tokio::time::interval(poll_interval(quiet));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            path = raw_rx.recv() => match path {
                Some(path) => files.observe(path, Instant::now()),
                None => break,
            },
            _ = ticker.tick() => {
                for path in files.take_settled(Instant::now()) {
                    if tx.send(path).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Watch mode: process files present at start-up, then every file created
/// in `watch_dir`, until Ctrl+C or SIGTERM.
pub async fn run_watch(state: Arc<AppState>, watch_dir: &Path) -> Result<RunSummary> {
    let watch_dir = watch_dir.canonicalize().map_err(|e| {
        AppError::Setup(format!("cannot resolve '{}': {e}", watch_dir.display()))
    })?;
    let quiet = Duration::from_millis(state.config.watch.debounce_ms);

    let (path_tx, mut path_rx) = mpsc::unbounded_channel::<PathBuf>();
    let watcher = start_watcher(&watch_dir, quiet, path_tx)?;

    tracing::info!(
        dir = %watcher.path().display(),
        debounce_ms = state.config.watch.debounce_ms,
        "Watching directory, press Ctrl+C to stop"
    );

    startup::enqueue_existing_files(&state, &watch_dir).await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let processor = tokio::spawn(queue::run_queue_processor(Arc::clone(&state), stop_rx));

    let shutdown_signal = shutdown::wait_for_shutdown();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            Some(path) = path_rx.recv() => {
                tracing::info!(file = %path.display(), "New file ready");
                let mut file_queue = state.file_queue.write().await;
                file_queue.enqueue(Task::new(path, TaskOrigin::Watch));
            }
            _ = &mut shutdown_signal => break,
        }
    }

    drop(watcher);
    let _ = stop_tx.send(true);
    let summary = processor
        .await
        .map_err(|e| AppError::Internal(format!("Queue processor panicked: {e}")))?;

    shutdown::graceful_shutdown(&state).await;

    Ok(summary)
}
