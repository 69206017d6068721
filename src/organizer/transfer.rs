use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::{AppError, Result};

/// Read size for hashing.
const BUFFER_SIZE: usize = 8192;

/// Move `source` to `destination` without ever leaving a partial file at
/// `destination`.
///
/// Same-volume moves are a single rename. Cross-volume moves copy into a
/// hidden sibling of `destination`, verify the SHA-256 against the source,
/// rename into place and only then delete the source.
pub async fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match tokio::fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if needs_copy(&e) => {
            tracing::debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Rename crosses filesystems, copying instead"
            );
            copy_verified(source, destination).await
        }
        Err(e) => Err(AppError::Filesystem(format!(
            "Failed to move {} to {}: {e}",
            source.display(),
            destination.display()
        ))),
    }
}

/// Whether a failed rename should fall back to copy-then-delete.
fn needs_copy(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

pub async fn copy_verified(source: &Path, destination: &Path) -> Result<()> {
    let partial = partial_path(destination)?;

    if let Err(e) = copy_to_partial(source, &partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    finish_copy(source, &partial, destination).await
}

/// Verify `partial` against `source`, rename it to `destination` and delete
/// `source`. On any failure before the rename lands, `partial` is removed
/// and `source` is left as it was.
async fn finish_copy(source: &Path, partial: &Path, destination: &Path) -> Result<()> {
    let verified = match sha256_file(source).await {
        Ok(expected) => verify_partial(&expected, partial).await,
        Err(e) => Err(e),
    };
    if let Err(e) = verified {
        let _ = tokio::fs::remove_file(partial).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(partial, destination).await {
        let _ = tokio::fs::remove_file(partial).await;
        return Err(AppError::Filesystem(format!(
            "Failed to finalize copy {}: {e}",
            destination.display()
        )));
    }

    tokio::fs::remove_file(source).await.map_err(|e| {
        AppError::Filesystem(format!(
            "Copied to {} but failed to remove source {}: {e}",
            destination.display(),
            source.display()
        ))
    })
}

async fn copy_to_partial(source: &Path, partial: &Path) -> Result<()> {
    let mut reader = tokio::fs::File::open(source).await.map_err(|e| {
        AppError::Filesystem(format!("Failed to read {}: {e}", source.display()))
    })?;
    let mut writer = tokio::fs::File::create(partial).await.map_err(|e| {
        AppError::Filesystem(format!("Failed to create {}: {e}", partial.display()))
    })?;

    tokio::io::copy(&mut reader, &mut writer).await.map_err(|e| {
        AppError::Filesystem(format!("Failed to copy {}: {e}", source.display()))
    })?;
    writer.sync_all().await?;

    Ok(())
}

async fn verify_partial(expected: &str, partial: &Path) -> Result<()> {
    let actual = sha256_file(partial).await?;
    if actual != expected {
        return Err(AppError::Filesystem(format!(
            "Checksum mismatch for {}: expected {expected}, got {actual}",
            partial.display()
        )));
    }
    Ok(())
}

fn partial_path(destination: &Path) -> Result<PathBuf> {
    let name = destination.file_name().ok_or_else(|| {
        AppError::Filesystem(format!("Invalid destination {}", destination.display()))
    })?;
    Ok(destination.with_file_name(format!(".{}.partial", name.to_string_lossy())))
}

/// Hex SHA-256 of a file, read in fixed-size chunks.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        AppError::Filesystem(format!("Failed to open {}: {e}", path.display()))
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = file.read(&mut buffer).await.map_err(|e| {
            AppError::Filesystem(format!("Failed to read {}: {e}", path.display()))
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
