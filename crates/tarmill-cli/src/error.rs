//! Error conversion utilities for CLI.
//!
//! Converts tarmill-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use tarmill_core::ArchiveError;

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: ArchiveError, archive: &Path) -> anyhow::Error {
    match err {
        ArchiveError::Fatal { message } => {
            anyhow!(
                "Extraction of '{}' was terminated: {}\n\
                 HINT: The archive may be truncated or corrupted. Entries written \
                 before the failure were left in place.",
                archive.display(),
                message
            )
        }
        ArchiveError::UnsupportedCompression { value } => {
            anyhow!(
                "Unsupported compression '{value}'\n\
                 HINT: Supported filters: gzip, bzip2, lz4, lzma, lzip, xz, uu, zstd"
            )
        }
        ArchiveError::WorkingDirectory { path, source } => {
            anyhow!(
                "Cannot use '{}' as the extraction directory: {}\n\
                 HINT: The destination must be a directory you can create and enter.",
                path.display(),
                source
            )
        }
        ArchiveError::PermissionDenied { path, .. } => {
            anyhow!(
                "Permission denied while archiving '{}'\n\
                 HINT: Check read and execute permissions on the source tree.",
                path.display()
            )
        }
        ArchiveError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or malformed.",
                archive.display(),
                reason
            )
        }
        ArchiveError::InvalidConfiguration(reason) => {
            anyhow!("Invalid configuration: {reason}")
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ArchiveError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_archive_error(e, archive))
}
