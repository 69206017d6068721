use std::path::PathBuf;

/// How a file came to be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrigin {
    /// Found by a directory scan (one-shot mode or watch start-up).
    Scan,
    /// Reported by the filesystem watcher.
    Watch,
}

/// A file waiting to go through the pipeline.
#[derive(Debug, Clone)]
pub struct Task {
    pub path: PathBuf,
    pub origin: TaskOrigin,
}

impl Task {
    pub fn new(path: PathBuf, origin: TaskOrigin) -> Self {
        Self { path, origin }
    }

    pub fn description(&self) -> String {
        let origin = match self.origin {
            TaskOrigin::Scan => "scan",
            TaskOrigin::Watch => "watch",
        };
        format!("Process {} ({origin})", self.path.display())
    }
}
