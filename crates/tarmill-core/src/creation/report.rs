//! Summary of a finished archive build.

use crate::codec::CompressionType;
use crate::creation::entry::EntryWritten;
use crate::types::EntryKind;
use std::time::Duration;

/// Counts and sizes for one archive, returned by
/// [`ArchiveBuilder::close`](crate::ArchiveBuilder::close).
///
/// # Examples
///
/// ```
/// use tarmill_core::CreationReport;
///
/// let mut report = CreationReport::default();
/// report.bytes_written = 4096;
/// report.bytes_compressed = 1024;
/// assert_eq!(report.compression_ratio(), 4.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreationReport {
    /// Compression filter the archive was written with.
    pub compression: Option<CompressionType>,

    /// Regular files appended.
    pub files_added: usize,

    /// Directory entries appended.
    pub directories_added: usize,

    /// Symlink entries appended.
    pub symlinks_added: usize,

    /// FIFO and device entries appended.
    pub special_files_added: usize,

    /// Content bytes streamed into the archive, before compression.
    pub bytes_written: u64,

    /// Size of the archive file on disk.
    pub bytes_compressed: u64,

    /// Entries found but not appended.
    pub entries_skipped: usize,

    /// One message per skipped entry.
    pub warnings: Vec<String>,

    /// Time from open to close.
    pub duration: Duration,
}

impl CreationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one [`write_entry`](crate::creation::entry::write_entry)
    /// result.
    pub fn record(&mut self, written: EntryWritten) {
        match written {
            EntryWritten::Appended { kind, bytes } => {
                match kind {
                    EntryKind::File => self.files_added += 1,
                    EntryKind::Directory => self.directories_added += 1,
                    EntryKind::Symlink => self.symlinks_added += 1,
                    _ => self.special_files_added += 1,
                }
                self.bytes_written += bytes;
            }
            EntryWritten::RootOmitted => {}
            EntryWritten::Skipped { reason } => {
                self.entries_skipped += 1;
                self.add_warning(reason);
            }
        }
    }

    /// Records a warning.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns `true` if anything was skipped or warned about.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Total entries appended.
    #[must_use]
    pub const fn total_entries(&self) -> usize {
        self.files_added + self.directories_added + self.symlinks_added + self.special_files_added
    }

    /// Content bytes per archive byte; 0.0 when either side is zero.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_compressed == 0 || self.bytes_written == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.bytes_compressed as f64
    }
}
