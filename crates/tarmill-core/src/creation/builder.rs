//! Write-mode archive lifecycle.

use crate::ArchiveError;
use crate::ArchiveOptions;
use crate::Result;
use crate::codec;
use crate::codec::FilterWriter;
use crate::creation::entry::ArchiveEntryDescriptor;
use crate::creation::entry::write_entry;
use crate::creation::report::CreationReport;
use crate::creation::walker;
use crate::creation::walker::TraversalSink;
use crate::creation::walker::UNBOUNDED_DEPTH;
use crate::io::CountingWriter;
use crate::probe::MetadataProbe;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

type ArchiveStream = tar::Builder<FilterWriter<CountingWriter<File>>>;

/// Builds one compressed ustar archive.
///
/// The output file is created and the compression filter installed by
/// [`new`](Self::new); entries are appended in call order; [`close`]
/// writes the end-of-archive blocks and the filter trailer. A builder
/// dropped without `close` finishes the stream on a best-effort basis and
/// logs a warning.
///
/// # Examples
///
/// ```no_run
/// use tarmill_core::ArchiveBuilder;
/// use tarmill_core::ArchiveOptions;
/// use tarmill_core::CompressionType;
///
/// let options = ArchiveOptions::default().with_compression(CompressionType::Xz);
/// let mut builder = ArchiveBuilder::new("backup.tar.xz", options)?;
/// builder.add_directory_as("/srv/data", "data")?;
/// builder.add_file_as("/etc/hostname", "meta/hostname")?;
/// let report = builder.close()?;
/// println!("{} entries", report.total_entries());
/// # Ok::<(), tarmill_core::ArchiveError>(())
/// ```
///
/// [`close`]: Self::close
pub struct ArchiveBuilder {
    path: PathBuf,
    options: ArchiveOptions,
    probe: MetadataProbe,
    stream: Option<ArchiveStream>,
    report: CreationReport,
    started: Instant,
}

impl ArchiveBuilder {
    /// Creates `path` and prepares it for entries.
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid, the file cannot be created, or the
    /// compression filter cannot be installed.
    pub fn new(path: impl AsRef<Path>, options: ArchiveOptions) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| ArchiveError::Open {
            path: path.clone(),
            source,
        })?;
        let filter = codec::install(
            CountingWriter::new(file),
            options.compression,
            options.compression_level,
        )?;
        log::info!(
            "opened {} for writing ({} filter)",
            path.display(),
            options.compression
        );

        let report = CreationReport {
            compression: Some(options.compression),
            ..CreationReport::default()
        };
        Ok(Self {
            path,
            options,
            probe: MetadataProbe::new(options.dereference_symlinks),
            stream: Some(tar::Builder::new(filter)),
            report,
            started: Instant::now(),
        })
    }

    /// Path of the archive being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options fixed at construction.
    #[must_use]
    pub const fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Counts so far.
    #[must_use]
    pub const fn report(&self) -> &CreationReport {
        &self.report
    }

    /// Adds a file under its own path (leading `/` dropped).
    pub fn add_file(&mut self, disk_path: impl AsRef<Path>) -> Result<()> {
        let disk_path = disk_path.as_ref();
        let archive_path = archive_name(disk_path)?;
        self.add_file_as(disk_path, &archive_path)
    }

    /// Adds a file, symlink, or special file under `archive_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::IsADirectory`] if `disk_path` is a
    /// directory under the dereference policy; use
    /// [`add_directory_as`](Self::add_directory_as) for those.
    pub fn add_file_as(&mut self, disk_path: impl AsRef<Path>, archive_path: &str) -> Result<()> {
        let mut emitter = self.emitter()?;
        emitter.add_single(disk_path.as_ref(), archive_path)
    }

    /// Adds a directory tree under its own path, without a depth limit.
    ///
    /// Returns `Ok(false)` if `disk_path` is not a directory.
    pub fn add_directory(&mut self, disk_path: impl AsRef<Path>) -> Result<bool> {
        let disk_path = disk_path.as_ref();
        let archive_path = archive_name(disk_path)?;
        self.add_directory_with_depth(disk_path, &archive_path, UNBOUNDED_DEPTH)
    }

    /// Adds a directory tree under `archive_path`, without a depth limit.
    pub fn add_directory_as(
        &mut self,
        disk_path: impl AsRef<Path>,
        archive_path: &str,
    ) -> Result<bool> {
        self.add_directory_with_depth(disk_path, archive_path, UNBOUNDED_DEPTH)
    }

    /// Adds a directory tree under `archive_path`, descending at most
    /// `max_depth` levels below it.
    ///
    /// Returns `Ok(false)` if `disk_path` is not a directory, so callers can
    /// fall back to [`add_file_as`](Self::add_file_as).
    pub fn add_directory_with_depth(
        &mut self,
        disk_path: impl AsRef<Path>,
        archive_path: &str,
        max_depth: usize,
    ) -> Result<bool> {
        let probe = self.probe;
        let mut emitter = self.emitter()?;
        walker::walk(&probe, disk_path.as_ref(), archive_path, max_depth, &mut emitter)
    }

    /// Finishes the archive and returns the report.
    ///
    /// # Errors
    ///
    /// Fails if the end-of-archive blocks, filter trailer, or final flush
    /// cannot be written. The file may then be truncated.
    pub fn close(mut self) -> Result<CreationReport> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| ArchiveError::InvalidArchive("archive already closed".into()))?;
        let counting = finish_stream(stream)?;
        self.report.bytes_compressed = counting.total_bytes();
        self.report.duration = self.started.elapsed();
        log::info!(
            "closed {}: {} entries, {} bytes",
            self.path.display(),
            self.report.total_entries(),
            self.report.bytes_compressed
        );
        Ok(std::mem::take(&mut self.report))
    }

    fn emitter(&mut self) -> Result<EntryEmitter<'_>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ArchiveError::InvalidArchive("archive already closed".into()))?;
        Ok(EntryEmitter {
            stream,
            options: &self.options,
            probe: &self.probe,
            report: &mut self.report,
        })
    }
}

impl Drop for ArchiveBuilder {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            log::warn!(
                "{} dropped without close(); finishing it anyway",
                self.path.display()
            );
            if let Err(e) = finish_stream(stream) {
                log::error!("failed to finish {}: {e}", self.path.display());
            }
        }
    }
}

impl std::fmt::Debug for ArchiveBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuilder")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("open", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

fn finish_stream(stream: ArchiveStream) -> Result<CountingWriter<File>> {
    let filter = stream.into_inner()?;
    let mut counting = filter.finish()?;
    counting.flush()?;
    Ok(counting)
}

fn archive_name(disk_path: &Path) -> Result<String> {
    disk_path
        .to_str()
        .map(ToString::to_string)
        .ok_or_else(|| ArchiveError::InvalidPath {
            path: disk_path.to_path_buf(),
        })
}

/// Borrowed view of an open builder that appends entries for the walker.
struct EntryEmitter<'a> {
    stream: &'a mut ArchiveStream,
    options: &'a ArchiveOptions,
    probe: &'a MetadataProbe,
    report: &'a mut CreationReport,
}

impl EntryEmitter<'_> {
    fn add_single(&mut self, disk_path: &Path, archive_path: &str) -> Result<()> {
        let metadata = self.probe.probe(disk_path).map_err(|source| ArchiveError::Open {
            path: disk_path.to_path_buf(),
            source,
        })?;
        if metadata.kind.is_directory() {
            return Err(ArchiveError::IsADirectory {
                path: disk_path.to_path_buf(),
            });
        }
        self.emit(&ArchiveEntryDescriptor::new(disk_path, archive_path, metadata))
    }

    fn emit(&mut self, descriptor: &ArchiveEntryDescriptor) -> Result<()> {
        let written = write_entry(self.stream, descriptor, self.options)?;
        self.report.record(written);
        Ok(())
    }
}

impl TraversalSink for EntryEmitter<'_> {
    fn add_directory_entry(&mut self, disk_path: &Path, archive_path: &str) -> Result<()> {
        // Directories reached by the walk are described by what they resolve
        // to, even when entered through a followed symlink.
        let metadata = MetadataProbe::new(true)
            .probe(disk_path)
            .map_err(|source| ArchiveError::ReadDirectory {
                path: disk_path.to_path_buf(),
                source,
            })?;
        self.emit(&ArchiveEntryDescriptor::new(disk_path, archive_path, metadata))
    }

    fn add_leaf(&mut self, disk_path: &Path, archive_path: &str) -> Result<()> {
        self.add_single(disk_path, archive_path)
    }
}
