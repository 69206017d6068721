use std::path::PathBuf;

use crate::classifier::ClassificationError;

/// Label extracted from one document image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub document_type: String,
    pub serial_number: String,
    /// Issuing site, when the model reported one. Logged only.
    pub site: Option<String>,
}

impl ClassificationResult {
    pub fn new(document_type: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            serial_number: serial_number.into(),
            site: None,
        }
    }
}

/// What the classifier decided for one file.
#[derive(Debug)]
pub enum ProcessingOutcome {
    Success(ClassificationResult),
    Failure(ClassificationError),
}

/// Where a file ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Renamed into its document type folder.
    Sorted,
    /// Moved unchanged into the failure bucket.
    Quarantined,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub placement: Placement,
}

/// Counters for one run (batch or watch session).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sorted: usize,
    pub quarantined: usize,
    pub errored: usize,
}

impl RunSummary {
    pub fn record(&mut self, report: &FileReport) {
        match report.placement {
            Placement::Sorted => self.sorted += 1,
            Placement::Quarantined => self.quarantined += 1,
        }
    }

    pub fn record_error(&mut self) {
        self.errored += 1;
    }

    pub fn total(&self) -> usize {
        self.sorted + self.quarantined + self.errored
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.sorted += other.sorted;
        self.quarantined += other.quarantined;
        self.errored += other.errored;
    }
}
