//! Sequential read access to archive entries.

use super::severity::Status;
use super::severity::Step;
use crate::types::EntryKind;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

/// Header of one archive entry as read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry name.
    pub path: PathBuf,
    /// Entry kind.
    pub kind: EntryKind,
    /// Target of a symlink or hard link.
    pub link_target: Option<PathBuf>,
    /// Permission bits.
    pub mode: u32,
    /// Content size in bytes.
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Owner user id.
    pub uid: u64,
    /// Owner group id.
    pub gid: u64,
    /// Fields that could not be parsed and were replaced by defaults.
    pub warnings: Vec<String>,
}

/// Location and length of a block produced by
/// [`ArchiveReader::read_data_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlock {
    /// Offset of the block within the entry's content.
    pub offset: u64,
    /// Bytes placed at the start of the caller's buffer.
    pub len: usize,
}

/// Read side of an extraction.
pub trait ArchiveReader {
    /// Advances to the next entry, skipping any unread content of the
    /// current one. `Ok(None)` marks the end of the archive.
    fn next_header(&mut self) -> Step<Option<EntryHeader>>;

    /// Reads the next block of the current entry into `buf`. `Ok(None)`
    /// marks the end of the entry.
    fn read_data_block(&mut self, buf: &mut [u8]) -> Step<Option<DataBlock>>;
}

/// [`ArchiveReader`] over a `tar` stream.
///
/// `tar::Entries` yields nothing after its first error, so once a read
/// fails every later call reports FATAL instead of an end of archive.
pub struct TarEntryReader<'a, R: Read> {
    entries: tar::Entries<'a, R>,
    current: Option<tar::Entry<'a, R>>,
    offset: u64,
    failure: Option<String>,
}

impl<'a, R: Read> TarEntryReader<'a, R> {
    /// Starts reading entries from `archive`.
    pub fn new(archive: &'a mut tar::Archive<R>) -> Step<Self> {
        let entries = archive
            .entries()
            .map_err(|e| Status::from_read_error("opening archive", &e))?;
        Ok(Self {
            entries,
            current: None,
            offset: 0,
            failure: None,
        })
    }

    fn check_stream(&self) -> Step<()> {
        match &self.failure {
            Some(message) => Err(Status::fatal(format!(
                "archive stream cannot resume after: {message}"
            ))),
            None => Ok(()),
        }
    }

    fn stream_failed(&mut self, what: &str, e: &io::Error) -> Status {
        let status = Status::from_read_error(what, e);
        self.current = None;
        self.failure = Some(status.message.clone());
        status
    }
}

/// Returns the parsed field, or `default` with a warning naming the field.
fn field_or<T>(
    parsed: io::Result<T>,
    default: T,
    field: &str,
    path: &Path,
    warnings: &mut Vec<String>,
) -> T {
    parsed.unwrap_or_else(|e| {
        let message = format!("{}: bad {field}: {e}", path.display());
        log::warn!("{message}");
        warnings.push(message);
        default
    })
}

impl<R: Read> ArchiveReader for TarEntryReader<'_, R> {
    fn next_header(&mut self) -> Step<Option<EntryHeader>> {
        self.check_stream()?;
        self.current = None;
        self.offset = 0;

        let entry = match self.entries.next() {
            None => return Ok(None),
            Some(Ok(entry)) => entry,
            Some(Err(e)) => return Err(self.stream_failed("reading entry header", &e)),
        };

        let path = entry
            .path()
            .map_err(|e| Status::warn(format!("unreadable entry name: {e}")))?
            .into_owned();
        let header = entry.header();
        let kind = EntryKind::from_tar(header.entry_type());
        let default_mode = if kind.is_directory() { 0o755 } else { 0o644 };

        let mut warnings = Vec::new();
        let link_target = field_or(
            entry
                .link_name()
                .map(|name| name.map(std::borrow::Cow::into_owned)),
            None,
            "link name",
            &path,
            &mut warnings,
        );
        let mode = field_or(header.mode(), default_mode, "mode", &path, &mut warnings);
        let mtime = field_or(header.mtime(), 0, "mtime", &path, &mut warnings);
        let uid = field_or(header.uid(), 0, "uid", &path, &mut warnings);
        let gid = field_or(header.gid(), 0, "gid", &path, &mut warnings);

        let parsed = EntryHeader {
            path,
            kind,
            link_target,
            mode,
            size: entry.size(),
            mtime,
            uid,
            gid,
            warnings,
        };

        self.current = Some(entry);
        Ok(Some(parsed))
    }

    fn read_data_block(&mut self, buf: &mut [u8]) -> Step<Option<DataBlock>> {
        self.check_stream()?;
        let Some(entry) = self.current.as_mut() else {
            return Ok(None);
        };
        let len = match entry.read(buf) {
            Ok(len) => len,
            Err(e) => return Err(self.stream_failed("reading entry data", &e)),
        };
        if len == 0 {
            return Ok(None);
        }
        let block = DataBlock {
            offset: self.offset,
            len,
        };
        self.offset += len as u64;
        Ok(Some(block))
    }
}
