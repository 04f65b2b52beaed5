//! Size classification and path validation.
//!
//! `classify` decides whether a file routes through the virtual access engine or
//! is small enough for an ordinary full load. `validate_file_path` gives the CLI
//! precise errors before any streaming starts.

use crate::error::{LineviewError, Result};
use std::path::Path;

/// Whether `path` should be opened through the engine rather than loaded whole
///
/// Files at or above `threshold` bytes are large. Any stat failure, or a path
/// that is not a regular file, classifies as not large so the caller falls back
/// to its ordinary loader instead of being blocked.
pub async fn classify(path: &Path, threshold: u64) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.is_file() && metadata.len() >= threshold,
        Err(err) => {
            log::debug!(
                "classify: stat failed for {}, treating as small: {}",
                path.display(),
                err
            );
            false
        }
    }
}

/// Validate that a file path is accessible and suitable for indexing
///
/// # Error Cases
/// - File does not exist
/// - Path points to a directory or other non-file
/// - File is not readable due to permissions
///
/// Empty files are accepted; they index to zero lines.
pub fn validate_file_path(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(LineviewError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(LineviewError::file_error("Failed to read file metadata", err)),
    };

    if !metadata.is_file() {
        return Err(LineviewError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    // Try to open the file to verify read permissions
    std::fs::File::open(path)
        .map_err(|e| LineviewError::file_error("Cannot open file for reading", e))?;

    Ok(())
}
