//! Error types for archive construction and extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while building, listing, or extracting archives.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation failed without a more specific context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file or archive could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        /// The path that could not be opened.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A directory could not be opened or enumerated during traversal.
    #[error("failed to read directory {path}: {source}")]
    ReadDirectory {
        /// The directory being read.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Permission was denied while descending into a directory.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Reading file content failed part-way through an entry.
    #[error("failed to read content of {path}: {source}")]
    ContentRead {
        /// The file whose content could not be read.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A directory was passed where a single file was expected.
    #[error("{path} is a directory; add it as a directory instead")]
    IsADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A path cannot be represented inside an archive.
    #[error("path cannot be stored in an archive: {path}")]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// Archive path argument was empty.
    #[error("archive path is empty")]
    EmptyPath,

    /// Compression type value does not name a known filter.
    #[error("unsupported compression type: {value}")]
    UnsupportedCompression {
        /// The rejected value, as given.
        value: String,
    },

    /// The selected compression filter could not be installed.
    #[error("failed to install {compression} filter: {source}")]
    FilterUnavailable {
        /// Name of the compression filter.
        compression: &'static str,
        /// Underlying codec error.
        source: std::io::Error,
    },

    /// Configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Archive stream is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Extraction hit an unrecoverable condition and was terminated.
    #[error("fatal extraction error: {message}")]
    Fatal {
        /// Description of the failing step.
        message: String,
    },

    /// Working directory could not be captured, changed, or restored.
    #[error("working directory error at {path}: {source}")]
    WorkingDirectory {
        /// The directory involved.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Returns `true` if this error was raised before any I/O took place
    /// because the requested configuration is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarmill_core::ArchiveError;
    ///
    /// let err = ArchiveError::UnsupportedCompression {
    ///     value: "rar".into(),
    /// };
    /// assert!(err.is_configuration_error());
    /// ```
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCompression { .. } | Self::InvalidConfiguration(_) | Self::EmptyPath
        )
    }

    /// Returns `true` if this error terminated an extraction.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Returns the raw OS error code carried by this error, if any.
    #[must_use]
    pub fn os_error(&self) -> Option<i32> {
        self.io_source().and_then(std::io::Error::raw_os_error)
    }

    /// Returns the underlying I/O error, if this variant carries one.
    #[must_use]
    pub const fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(source)
            | Self::Open { source, .. }
            | Self::ReadDirectory { source, .. }
            | Self::PermissionDenied { source, .. }
            | Self::ContentRead { source, .. }
            | Self::FilterUnavailable { source, .. }
            | Self::WorkingDirectory { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the path this error refers to, if any.
    #[must_use]
    pub fn context(&self) -> Option<&std::path::Path> {
        match self {
            Self::Open { path, .. }
            | Self::ReadDirectory { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::ContentRead { path, .. }
            | Self::IsADirectory { path }
            | Self::InvalidPath { path }
            | Self::WorkingDirectory { path, .. } => Some(path),
            _ => None,
        }
    }
}
