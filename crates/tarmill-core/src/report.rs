//! Extraction reporting.

use crate::codec::CompressionType;
use crate::types::EntryKind;
use std::time::Duration;

/// Report of an archive extraction.
///
/// Contains counts of what reached the disk plus every warning the
/// extraction loop logged while skipping entries.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// Compression filter detected on the archive, if any.
    pub compression: Option<CompressionType>,

    /// Number of regular files extracted.
    pub files_extracted: usize,

    /// Number of directories created.
    pub directories_created: usize,

    /// Number of symlinks created.
    pub symlinks_created: usize,

    /// Number of hard links created.
    pub hardlinks_created: usize,

    /// Entries the extraction moved past without creating them.
    pub entries_skipped: usize,

    /// Content bytes written to disk.
    pub bytes_written: u64,

    /// Size of the archive file.
    pub archive_size: u64,

    /// Warnings generated during extraction.
    pub warnings: Vec<String>,

    /// The reader kept asking for a retry, so the extraction stopped before
    /// the end of the archive without an error.
    pub stopped_early: bool,

    /// Duration of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one entry that reached the disk.
    pub fn record_created(&mut self, kind: EntryKind) {
        match kind {
            EntryKind::File => self.files_extracted += 1,
            EntryKind::Directory => self.directories_created += 1,
            EntryKind::Symlink => self.symlinks_created += 1,
            EntryKind::Hardlink => self.hardlinks_created += 1,
            _ => {}
        }
    }

    /// Counts one skipped entry and keeps its reason.
    pub fn record_skipped(&mut self, reason: impl Into<String>) {
        self.entries_skipped += 1;
        self.add_warning(reason);
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns total number of items created.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.files_extracted
            + self.directories_created
            + self.symlinks_created
            + self.hardlinks_created
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
