use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Check that the input directory exists before any work starts.
pub fn ensure_input_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(AppError::Setup(format!(
            "input directory '{}' not found",
            path.display()
        )));
    }
    Ok(())
}

/// Whether a file name is eligible for processing (hidden files are not).
pub fn is_candidate_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.')
}

/// Regular files directly inside `dir`, sorted by name.
///
/// Subdirectories, symlinks and hidden files are skipped.
pub async fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(|e| {
        AppError::Filesystem(format!("Failed to read directory {}: {e}", dir.display()))
    })?;

    while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
        AppError::Filesystem(format!("Failed to read directory entry: {e}"))
    })? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_candidate_name(&name) {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| AppError::Filesystem(format!("Failed to get file type: {e}")))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}
