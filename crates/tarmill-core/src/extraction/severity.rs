//! Severity classification of extraction steps.
//!
//! Each header read, header write, data block and entry finish returns a
//! [`Step`]. `Ok` is the OK severity (for header reads, `Ok(None)` is the
//! end-of-archive marker); every other severity travels as a [`Status`] in
//! the error position.

use std::fmt;
use std::io;

/// Non-OK severity of a step, from mildest to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Transient; the same operation may succeed if repeated.
    Retry,
    /// The entry could not be handled, but the archive can go on.
    Warn,
    /// The entry failed in a way that compromises the extraction.
    Failed,
    /// The archive or disk writer is unusable.
    Fatal,
}

impl Severity {
    /// Returns `true` for severities that end an extraction.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Failed | Self::Fatal)
    }

    /// Uppercase label used in log messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Retry => "RETRY",
            Self::Warn => "WARN",
            Self::Failed => "FAILED",
            Self::Fatal => "FATAL",
        }
    }
}

/// A non-OK step result with its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// How bad it is.
    pub severity: Severity,
    /// What went wrong.
    pub message: String,
}

/// Result of one extraction step.
pub type Step<T> = std::result::Result<T, Status>;

impl Status {
    /// Builds a status.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    /// Builds a [`Severity::Retry`] status.
    pub fn retry(message: impl Into<String>) -> Self {
        Self::new(Severity::Retry, message)
    }

    /// Builds a [`Severity::Warn`] status.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, message)
    }

    /// Builds a [`Severity::Failed`] status.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(Severity::Failed, message)
    }

    /// Builds a [`Severity::Fatal`] status.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }

    /// Classifies an error from the archive stream. Interruptions can be
    /// retried; anything else means the stream can no longer be trusted.
    #[must_use]
    pub fn from_read_error(context: &str, error: &io::Error) -> Self {
        let message = format!("{context}: {error}");
        match error.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Self::retry(message),
            _ => Self::fatal(message),
        }
    }

    /// Classifies an error from writing to disk.
    #[must_use]
    pub fn from_write_error(context: &str, error: &io::Error) -> Self {
        let message = format!("{context}: {error}");
        match error.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Self::retry(message),
            io::ErrorKind::AlreadyExists => Self::warn(message),
            io::ErrorKind::StorageFull | io::ErrorKind::ReadOnlyFilesystem => {
                Self::fatal(message)
            }
            _ => Self::failed(message),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.label(), self.message)
    }
}

/// What the extraction loop does after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Step succeeded; carry on.
    Continue,
    /// Repeat the step once.
    Retry,
    /// Log, then move to the next entry.
    Warn(String),
    /// Stop the extraction with an error.
    Abort(String),
}

impl From<Status> for ExtractionOutcome {
    fn from(status: Status) -> Self {
        match status.severity {
            Severity::Retry => Self::Retry,
            Severity::Warn => Self::Warn(status.message),
            Severity::Failed | Severity::Fatal => Self::Abort(status.message),
        }
    }
}

impl<T> From<Step<T>> for ExtractionOutcome {
    fn from(step: Step<T>) -> Self {
        step.map_or_else(Self::from, |_| Self::Continue)
    }
}
