//! Core extraction engine.
//!
//! [`replay`] drives an [`ArchiveReader`] into a [`DiskWriter`] and decides,
//! step by step, whether a non-OK result is retried, skipped, stops the run
//! cleanly or terminates it:
//!
//! | step result | action |
//! |---|---|
//! | OK | proceed; copy content blocks when the entry has data |
//! | RETRY | repeat once; OK proceeds, RETRY/WARN stops cleanly, worse is fatal |
//! | WARN | log, move to the next entry |
//! | FAILED / FATAL | return [`ArchiveError::Fatal`] |
//! | end of archive | finish |
//!
//! Field warnings carried by an OK header go into the report and the entry
//! is still written.

use super::disk::DiskWriter;
use super::disk::FsDiskWriter;
use super::reader::ArchiveReader;
use super::reader::EntryHeader;
use super::reader::TarEntryReader;
use super::severity::ExtractionOutcome;
use super::severity::Severity;
use super::severity::Status;
use super::severity::Step;
use super::workdir::WorkingDirGuard;
use crate::ArchiveError;
use crate::ExtractionReport;
use crate::Result;
use crate::codec;
use crate::config::ExtractOptions;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

/// Size of the buffer content blocks are copied through.
pub const DATA_BLOCK_SIZE: usize = 10 * 1024;

/// Extracts and lists one archive file.
///
/// # Examples
///
/// ```no_run
/// use tarmill_core::ExtractOptions;
/// use tarmill_core::ExtractionEngine;
///
/// let engine = ExtractionEngine::new("backup.tar.gz")?;
/// let report = engine.decompress("restore/", ExtractOptions::default())?;
/// println!("{} files", report.files_extracted);
/// # Ok::<(), tarmill_core::ArchiveError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionEngine {
    path: PathBuf,
}

impl ExtractionEngine {
    /// Creates an engine for the archive at `path`. Nothing is opened yet.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EmptyPath`] if `path` is empty.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ArchiveError::EmptyPath);
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Archive this engine reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extracts every entry into `dest`, creating it if missing.
    ///
    /// The destination becomes the process working directory while entries
    /// are written; the original directory is restored before returning on
    /// every path.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Open`] if the archive cannot be opened.
    /// - [`ArchiveError::WorkingDirectory`] if `dest` cannot be entered or
    ///   the original directory cannot be restored.
    /// - [`ArchiveError::Fatal`] if a step reports FAILED or FATAL severity.
    pub fn decompress(
        &self,
        dest: impl AsRef<Path>,
        options: ExtractOptions,
    ) -> Result<ExtractionReport> {
        let started = Instant::now();
        let dest = dest.as_ref();

        let (mut report, mut archive) = self.open()?;
        let guard = WorkingDirGuard::enter(dest)?;
        log::info!(
            "extracting {} into {} with {options:?}",
            self.path.display(),
            dest.display()
        );

        let mut writer = FsDiskWriter::new(".", options);
        let replayed = match TarEntryReader::new(&mut archive) {
            Ok(mut reader) => replay(&mut reader, &mut writer, &mut report),
            Err(status) => Err(fatal("opening archive", &status)),
        };
        let closed = if replayed.is_ok() {
            writer.close()
        } else {
            Ok(())
        };
        drop(writer);
        drop(archive);
        let restored = guard.restore();

        replayed?;
        restored?;
        if let Err(status) = closed {
            if status.severity.is_fatal() {
                return Err(fatal("closing disk writer", &status));
            }
            log::warn!("{status}");
            report.add_warning(status.message);
        }

        report.duration = started.elapsed();
        log::info!(
            "extracted {} entries ({} bytes) from {} in {:?}",
            report.total_items(),
            report.bytes_written,
            self.path.display(),
            report.duration
        );
        Ok(report)
    }

    /// Reads every header without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Open`] if the archive cannot be opened, or
    /// [`ArchiveError::Fatal`] if a header cannot be read.
    pub fn list(&self) -> Result<Vec<EntryHeader>> {
        let (_, mut archive) = self.open()?;
        let mut reader =
            TarEntryReader::new(&mut archive).map_err(|status| fatal("opening archive", &status))?;
        let mut headers = Vec::new();
        loop {
            match resolve("reading header", || reader.next_header())? {
                Flow::Proceed(Some(header)) => headers.push(header),
                Flow::Proceed(None) | Flow::Stop => break,
                Flow::Skip(_) => {}
            }
        }
        Ok(headers)
    }

    fn open(&self) -> Result<(ExtractionReport, tar::Archive<Box<dyn Read>>)> {
        let file = File::open(&self.path).map_err(|source| ArchiveError::Open {
            path: self.path.clone(),
            source,
        })?;
        let archive_size = file.metadata().map_or(0, |m| m.len());
        let (compression, decoder) = codec::open_decoder(BufReader::new(file))?;
        log::debug!(
            "{}: {} bytes, filter {}",
            self.path.display(),
            archive_size,
            compression.map_or("none", |c| c.name())
        );

        let report = ExtractionReport {
            compression,
            archive_size,
            ..ExtractionReport::default()
        };
        Ok((report, tar::Archive::new(decoder)))
    }
}

/// Extracts `archive` into `dest`.
///
/// # Errors
///
/// See [`ExtractionEngine::decompress`].
pub fn decompress(
    archive: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: ExtractOptions,
) -> Result<ExtractionReport> {
    ExtractionEngine::new(archive)?.decompress(dest, options)
}

/// Lists the entries of `archive`.
///
/// # Errors
///
/// See [`ExtractionEngine::list`].
pub fn list_archive(archive: impl AsRef<Path>) -> Result<Vec<EntryHeader>> {
    ExtractionEngine::new(archive)?.list()
}

/// How the loop continues after a header step.
enum Flow<T> {
    Proceed(T),
    Skip(String),
    Stop,
}

fn fatal(what: &str, status: &Status) -> ArchiveError {
    log::error!("{what}: {status}");
    ArchiveError::Fatal {
        message: format!("{what}: {}", status.message),
    }
}

/// Runs a header step, retrying it once on RETRY.
fn resolve<T>(what: &str, mut step: impl FnMut() -> Step<T>) -> Result<Flow<T>> {
    let status = match step() {
        Ok(value) => return Ok(Flow::Proceed(value)),
        Err(status) => status,
    };
    match status.severity {
        Severity::Warn => {
            log::warn!("{what}: {}", status.message);
            Ok(Flow::Skip(status.message))
        }
        Severity::Failed | Severity::Fatal => Err(fatal(what, &status)),
        Severity::Retry => {
            log::debug!("{what}: {}; retrying", status.message);
            match step() {
                Ok(value) => Ok(Flow::Proceed(value)),
                Err(again) if again.severity.is_fatal() => Err(fatal(what, &again)),
                Err(again) => {
                    log::warn!("{what}: {} after retry, stopping", again.message);
                    Ok(Flow::Stop)
                }
            }
        }
    }
}

fn copy_data<R, D>(
    reader: &mut R,
    writer: &mut D,
    buf: &mut [u8],
    report: &mut ExtractionReport,
) -> Step<()>
where
    R: ArchiveReader + ?Sized,
    D: DiskWriter + ?Sized,
{
    while let Some(block) = reader.read_data_block(buf)? {
        writer.write_data_block(&buf[..block.len], block.offset)?;
        report.bytes_written += block.len as u64;
    }
    Ok(())
}

/// Replays every entry of `reader` into `writer`.
///
/// Returns `Ok` at the end of the archive and on the clean stop after a
/// repeated RETRY, which sets [`ExtractionReport::stopped_early`]. Does not
/// close `writer`.
///
/// # Errors
///
/// Returns [`ArchiveError::Fatal`] as soon as a header step, a data block or
/// an entry finish reports FAILED or FATAL severity.
pub fn replay<R, D>(reader: &mut R, writer: &mut D, report: &mut ExtractionReport) -> Result<()>
where
    R: ArchiveReader + ?Sized,
    D: DiskWriter + ?Sized,
{
    let mut buf = vec![0u8; DATA_BLOCK_SIZE];
    loop {
        let header = match resolve("reading header", || reader.next_header())? {
            Flow::Proceed(Some(header)) => header,
            Flow::Proceed(None) => break,
            Flow::Skip(reason) => {
                report.record_skipped(reason);
                continue;
            }
            Flow::Stop => {
                report.stopped_early = true;
                break;
            }
        };

        for warning in &header.warnings {
            report.add_warning(warning.clone());
        }

        let what = format!("writing {}", header.path.display());
        match resolve(&what, || writer.write_header(&header))? {
            Flow::Proceed(()) => {}
            Flow::Skip(reason) => {
                report.record_skipped(reason);
                continue;
            }
            Flow::Stop => {
                report.stopped_early = true;
                break;
            }
        }

        if header.size > 0
            && let Err(status) = copy_data(reader, writer, &mut buf, report)
        {
            writer.abort_entry();
            match ExtractionOutcome::from(status.clone()) {
                ExtractionOutcome::Abort(_) => {
                    return Err(fatal(&format!("copying {}", header.path.display()), &status));
                }
                _ => {
                    log::warn!("copying {}: {status}", header.path.display());
                    report.record_skipped(status.message);
                    continue;
                }
            }
        }

        match ExtractionOutcome::from(writer.finish_entry()) {
            ExtractionOutcome::Continue => {}
            ExtractionOutcome::Abort(message) => {
                return Err(fatal(
                    &format!("finishing {}", header.path.display()),
                    &Status::failed(message),
                ));
            }
            ExtractionOutcome::Warn(message) => {
                log::warn!("{message}");
                report.add_warning(message);
            }
            ExtractionOutcome::Retry => {
                report.add_warning(format!(
                    "{}: metadata not applied",
                    header.path.display()
                ));
            }
        }
        report.record_created(header.kind);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::CompressionType;
    use crate::extraction::reader::DataBlock;
    use crate::test_utils::InterruptOnce;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::patch_header;
    use crate::types::EntryKind;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn header(path: &str, kind: EntryKind, size: u64) -> EntryHeader {
        EntryHeader {
            path: PathBuf::from(path),
            kind,
            link_target: None,
            mode: 0o644,
            size,
            mtime: 0,
            uid: 0,
            gid: 0,
            warnings: Vec::new(),
        }
    }

    /// Reader that replays scripted header results. Each file entry yields
    /// one data block of `size` bytes unless a data result is scripted.
    #[derive(Default)]
    struct ScriptedReader {
        headers: VecDeque<Step<Option<EntryHeader>>>,
        data: VecDeque<Step<Option<DataBlock>>>,
        pending: Option<u64>,
        header_calls: usize,
    }

    impl ScriptedReader {
        fn new(headers: Vec<Step<Option<EntryHeader>>>) -> Self {
            Self {
                headers: headers.into(),
                ..Self::default()
            }
        }
    }

    impl ArchiveReader for ScriptedReader {
        fn next_header(&mut self) -> Step<Option<EntryHeader>> {
            self.header_calls += 1;
            let next = self.headers.pop_front().unwrap_or(Ok(None));
            self.pending = match &next {
                Ok(Some(h)) => Some(h.size),
                _ => None,
            };
            next
        }

        fn read_data_block(&mut self, buf: &mut [u8]) -> Step<Option<DataBlock>> {
            if let Some(scripted) = self.data.pop_front() {
                return scripted;
            }
            let Some(size) = self.pending.take() else {
                return Ok(None);
            };
            let len = usize::try_from(size).unwrap();
            buf[..len].fill(b'x');
            Ok(Some(DataBlock { offset: 0, len }))
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        header_results: VecDeque<Step<()>>,
        finish_results: VecDeque<Step<()>>,
        created: Vec<PathBuf>,
        bytes: usize,
        finished: usize,
        aborted: usize,
    }

    impl DiskWriter for RecordingWriter {
        fn write_header(&mut self, header: &EntryHeader) -> Step<()> {
            let result = self.header_results.pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.created.push(header.path.clone());
            }
            result
        }

        fn write_data_block(&mut self, data: &[u8], _offset: u64) -> Step<()> {
            self.bytes += data.len();
            Ok(())
        }

        fn finish_entry(&mut self) -> Step<()> {
            self.finished += 1;
            self.finish_results.pop_front().unwrap_or(Ok(()))
        }

        fn abort_entry(&mut self) {
            self.aborted += 1;
        }

        fn close(&mut self) -> Step<()> {
            Ok(())
        }
    }

    fn run(reader: &mut ScriptedReader, writer: &mut RecordingWriter) -> (Result<()>, ExtractionReport) {
        let mut report = ExtractionReport::new();
        let result = replay(reader, writer, &mut report);
        (result, report)
    }

    #[test]
    fn test_replays_all_entries() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("dir/", EntryKind::Directory, 0))),
            Ok(Some(header("dir/a.txt", EntryKind::File, 5))),
            Ok(Some(header("dir/link", EntryKind::Symlink, 0))),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.created.len(), 3);
        assert_eq!(writer.bytes, 5);
        assert_eq!(writer.finished, 3);
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.symlinks_created, 1);
        assert_eq!(report.bytes_written, 5);
        assert!(!report.stopped_early);
    }

    #[test]
    fn test_read_warn_skips_entry() {
        let mut reader = ScriptedReader::new(vec![
            Err(Status::warn("bad mtime")),
            Ok(Some(header("b.txt", EntryKind::File, 1))),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.created, vec![PathBuf::from("b.txt")]);
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(report.warnings, vec!["bad mtime".to_string()]);
    }

    #[test]
    fn test_read_retry_then_ok_proceeds() {
        let mut reader = ScriptedReader::new(vec![
            Err(Status::retry("interrupted")),
            Ok(Some(header("a.txt", EntryKind::File, 3))),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(report.files_extracted, 1);
        assert_eq!(writer.bytes, 3);
    }

    #[test]
    fn test_read_retry_twice_stops_cleanly() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("a.txt", EntryKind::File, 1))),
            Err(Status::retry("interrupted")),
            Err(Status::warn("still interrupted")),
            Ok(Some(header("never.txt", EntryKind::File, 1))),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert!(report.stopped_early);
        assert_eq!(writer.created, vec![PathBuf::from("a.txt")]);
        assert_eq!(reader.header_calls, 3);
    }

    #[test]
    fn test_read_retry_then_fatal_aborts() {
        let mut reader = ScriptedReader::new(vec![
            Err(Status::retry("interrupted")),
            Err(Status::fatal("truncated")),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, _) = run(&mut reader, &mut writer);

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_read_failed_aborts_immediately() {
        let mut reader = ScriptedReader::new(vec![
            Err(Status::failed("checksum")),
            Ok(Some(header("never.txt", EntryKind::File, 1))),
        ]);
        let mut writer = RecordingWriter::default();
        let (result, _) = run(&mut reader, &mut writer);

        assert!(result.unwrap_err().is_fatal());
        assert_eq!(reader.header_calls, 1);
        assert!(writer.created.is_empty());
    }

    #[test]
    fn test_write_warn_skips_data() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("exists.txt", EntryKind::File, 4))),
            Ok(Some(header("new.txt", EntryKind::File, 2))),
        ]);
        let mut writer = RecordingWriter {
            header_results: vec![Err(Status::warn("exists.txt: already exists"))].into(),
            ..RecordingWriter::default()
        };
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.bytes, 2);
        assert_eq!(writer.finished, 1);
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(report.files_extracted, 1);
    }

    #[test]
    fn test_write_retry_then_ok_copies() {
        let mut reader = ScriptedReader::new(vec![Ok(Some(header("a.txt", EntryKind::File, 4)))]);
        let mut writer = RecordingWriter {
            header_results: vec![Err(Status::retry("busy")), Ok(())].into(),
            ..RecordingWriter::default()
        };
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.bytes, 4);
        assert_eq!(report.files_extracted, 1);
    }

    #[test]
    fn test_write_retry_then_retry_stops_cleanly() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("a.txt", EntryKind::File, 4))),
            Ok(Some(header("b.txt", EntryKind::File, 4))),
        ]);
        let mut writer = RecordingWriter {
            header_results: vec![Err(Status::retry("busy")), Err(Status::retry("busy"))].into(),
            ..RecordingWriter::default()
        };
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert!(report.stopped_early);
        assert_eq!(writer.bytes, 0);
        assert_eq!(reader.header_calls, 1);
    }

    #[test]
    fn test_write_fatal_aborts() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("a.txt", EntryKind::File, 4))),
            Ok(Some(header("b.txt", EntryKind::File, 4))),
        ]);
        let mut writer = RecordingWriter {
            header_results: vec![Err(Status::fatal("disk full"))].into(),
            ..RecordingWriter::default()
        };
        let (result, _) = run(&mut reader, &mut writer);

        assert!(result.unwrap_err().is_fatal());
        assert_eq!(reader.header_calls, 1);
    }

    #[test]
    fn test_data_error_aborts_entry() {
        let mut reader = ScriptedReader::new(vec![Ok(Some(header("a.txt", EntryKind::File, 4)))]);
        reader.data.push_back(Err(Status::fatal("corrupt block")));
        let mut writer = RecordingWriter::default();
        let (result, _) = run(&mut reader, &mut writer);

        assert!(result.unwrap_err().is_fatal());
        assert_eq!(writer.aborted, 1);
        assert_eq!(writer.finished, 0);
    }

    #[test]
    fn test_data_warning_skips_entry() {
        let mut reader = ScriptedReader::new(vec![
            Ok(Some(header("a.txt", EntryKind::File, 4))),
            Ok(Some(header("b.txt", EntryKind::File, 1))),
        ]);
        reader.data.push_back(Err(Status::warn("short block")));
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.aborted, 1);
        assert_eq!(report.entries_skipped, 1);
        assert_eq!(report.files_extracted, 1);
    }

    #[test]
    fn test_finish_warning_still_counts() {
        let mut reader = ScriptedReader::new(vec![Ok(Some(header("a.txt", EntryKind::File, 0)))]);
        let mut writer = RecordingWriter {
            finish_results: vec![Err(Status::warn("a.txt: cannot set owner"))].into(),
            ..RecordingWriter::default()
        };
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_header_warnings_are_reported_and_entry_written() {
        let mut warned = header("a.txt", EntryKind::File, 2);
        warned.warnings.push("a.txt: bad mtime: not a number".to_string());
        let mut reader = ScriptedReader::new(vec![Ok(Some(warned))]);
        let mut writer = RecordingWriter::default();
        let (result, report) = run(&mut reader, &mut writer);

        result.unwrap();
        assert_eq!(writer.created, vec![PathBuf::from("a.txt")]);
        assert_eq!(writer.bytes, 2);
        assert_eq!(report.entries_skipped, 0);
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.warnings, vec!["a.txt: bad mtime: not a number".to_string()]);
    }

    fn replay_tar<R: Read>(archive: R, dest: &Path) -> (Result<()>, ExtractionReport) {
        let mut archive = tar::Archive::new(archive);
        let mut reader = TarEntryReader::new(&mut archive).unwrap();
        let mut writer = FsDiskWriter::new(dest, ExtractOptions::default());
        let mut report = ExtractionReport::new();
        let result = replay(&mut reader, &mut writer, &mut report);
        (result, report)
    }

    #[test]
    fn test_interrupted_stream_fails_instead_of_truncating() {
        let temp = TempDir::new().unwrap();
        let bytes = TarTestBuilder::new()
            .add_file("first.txt", b"first\n")
            .add_file("second.txt", b"second\n")
            .build();

        let (result, report) = replay_tar(InterruptOnce::new(Cursor::new(bytes), 1024), temp.path());

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("cannot resume"));
        assert_eq!(report.files_extracted, 1);
        assert!(temp.path().join("first.txt").exists());
        assert!(!temp.path().join("second.txt").exists());
    }

    #[test]
    fn test_entry_with_bad_mtime_is_still_extracted() {
        let temp = TempDir::new().unwrap();
        let mut bytes = TarTestBuilder::new()
            .add_file("warned.txt", b"w")
            .add_file("ok.txt", b"ok")
            .build();
        patch_header(&mut bytes, 0, |h| h.as_old_mut().mtime = *b"zzzzzzzzzzz\0");

        let (result, report) = replay_tar(Cursor::new(bytes), temp.path());

        result.unwrap();
        assert_eq!(report.entries_skipped, 0);
        assert_eq!(report.files_extracted, 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("warned.txt: bad mtime"));
        assert_eq!(std::fs::read(temp.path().join("warned.txt")).unwrap(), b"w");
        assert_eq!(std::fs::read(temp.path().join("ok.txt")).unwrap(), b"ok");
    }

    #[cfg(unix)]
    #[test]
    fn test_decompress_restores_modes_links_and_times() {
        use std::os::unix::fs::MetadataExt;
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fixture.tar.zst");
        TarTestBuilder::new()
            .with_mtime(1_234_567_890)
            .add_directory_with_mode("bin/", 0o750)
            .add_file_with_mode("bin/tool", b"#!/bin/sh\n", 0o755)
            .add_hardlink("bin/tool-alias", "bin/tool")
            .add_fifo("bin/pipe")
            .write_to(&archive, CompressionType::Zstd);

        let dest = temp.path().join("out");
        let report = decompress(&archive, &dest, ExtractOptions::default()).unwrap();

        assert_eq!(report.compression, Some(CompressionType::Zstd));
        assert_eq!(report.hardlinks_created, 1);
        assert_eq!(report.entries_skipped, 1);
        let tool = std::fs::metadata(dest.join("bin/tool")).unwrap();
        assert_eq!(tool.permissions().mode() & 0o7777, 0o755);
        assert_eq!(tool.mtime(), 1_234_567_890);
        let alias = std::fs::metadata(dest.join("bin/tool-alias")).unwrap();
        assert_eq!(alias.ino(), tool.ino());
        let dir = std::fs::metadata(dest.join("bin")).unwrap();
        assert_eq!(dir.permissions().mode() & 0o7777, 0o750);
        assert!(!dest.join("bin/pipe").exists());
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = ExtractionEngine::new("").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_missing_archive_is_open_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = decompress(temp.path().join("missing.tar"), temp.path(), ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Open { .. }));
    }
}
