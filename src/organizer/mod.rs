pub mod naming;
pub mod transfer;

use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{AppError, Result};
use crate::types::{FileReport, Placement, ProcessingOutcome};

/// Failure bucket directory name under the output root.
pub const FAILED_DIR: &str = "_failed_to_process";

/// Upper bound on `_<n>` suffixes tried before giving up on a name.
const MAX_SUFFIX: usize = 10_000;

/// Destination chosen for a file, before collision handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub dir: PathBuf,
    pub file_name: String,
    pub placement: Placement,
}

/// Moves classified files into `<root>/<type>/<type>_<serial>.<ext>` and
/// everything else into `<root>/_failed_to_process/<original name>`.
///
/// Existing files are never overwritten: a taken name gets the first free
/// `_<n>` suffix.
pub struct FileOrganizer {
    output_root: PathBuf,
}

impl FileOrganizer {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            output_root: config.root.clone(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn failure_dir(&self) -> PathBuf {
        self.output_root.join(FAILED_DIR)
    }

    pub fn plan(&self, source: &Path, outcome: &ProcessingOutcome) -> Result<Plan> {
        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::Filesystem(format!("Invalid source path {}", source.display()))
            })?;

        if let ProcessingOutcome::Success(result) = outcome {
            let doc_type = naming::sanitize_document_type(&result.document_type);
            let serial = naming::sanitize_serial(&result.serial_number);

            if !doc_type.is_empty() && !serial.is_empty() {
                return Ok(Plan {
                    dir: self.output_root.join(&doc_type),
                    file_name: naming::sorted_file_name(&doc_type, &serial, source),
                    placement: Placement::Sorted,
                });
            }

            tracing::warn!(
                file = %original_name,
                document_type = %result.document_type,
                serial = %result.serial_number,
                "Label has no usable characters, routing to failure bucket"
            );
        }

        Ok(Plan {
            dir: self.failure_dir(),
            file_name: original_name,
            placement: Placement::Quarantined,
        })
    }

    /// Move `source` to the place its outcome dictates.
    pub async fn organize(&self, source: &Path, outcome: &ProcessingOutcome) -> Result<FileReport> {
        let plan = self.plan(source, outcome)?;

        tokio::fs::create_dir_all(&plan.dir).await.map_err(|e| {
            AppError::Filesystem(format!("Failed to create {}: {e}", plan.dir.display()))
        })?;

        let destination = next_free_path(&plan.dir, &plan.file_name).await?;
        transfer::move_file(source, &destination).await?;

        Ok(FileReport {
            source: source.to_path_buf(),
            destination,
            placement: plan.placement,
        })
    }
}

/// `dir/name`, or `dir/<stem>_<n>.<ext>` for the smallest free `n`.
pub async fn next_free_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let candidate = dir.join(file_name);
    if !path_taken(&candidate).await? {
        return Ok(candidate);
    }

    for n in 1..=MAX_SUFFIX {
        let candidate = dir.join(naming::suffixed_file_name(file_name, n));
        if !path_taken(&candidate).await? {
            tracing::info!(
                wanted = file_name,
                chosen = %candidate.display(),
                "Destination name taken, using suffix"
            );
            return Ok(candidate);
        }
    }

    Err(AppError::Filesystem(format!(
        "No free name for {file_name} in {}",
        dir.display()
    )))
}

async fn path_taken(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| AppError::Filesystem(format!("Failed to inspect {}: {e}", path.display())))
}
