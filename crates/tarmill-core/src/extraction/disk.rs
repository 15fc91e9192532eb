//! Write side of an extraction: turns entry headers and data blocks into
//! filesystem objects.

use super::reader::EntryHeader;
use super::severity::Status;
use super::severity::Step;
use crate::config::ExtractOptions;
use crate::types::EntryKind;
use filetime::FileTime;
use std::fs;
use std::fs::File;
use std::io;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Write side of an extraction.
///
/// Calls arrive as `write_header`, any number of `write_data_block`, then
/// `finish_entry` (or `abort_entry` when the copy failed), repeated per
/// entry, and a single `close` at the end.
pub trait DiskWriter {
    /// Creates the object `header` describes.
    fn write_header(&mut self, header: &EntryHeader) -> Step<()>;

    /// Writes `data` at `offset` within the current entry.
    fn write_data_block(&mut self, data: &[u8], offset: u64) -> Step<()>;

    /// Completes the current entry and applies its metadata.
    fn finish_entry(&mut self) -> Step<()>;

    /// Drops the current entry after a failed copy. Bytes already written
    /// stay on disk.
    fn abort_entry(&mut self) {}

    /// Applies deferred metadata. Called once after the last entry.
    fn close(&mut self) -> Step<()>;
}

/// File being filled with entry content.
#[derive(Debug)]
struct OpenFile {
    file: File,
    /// Where the bytes go; a temporary sibling under `SAFE_WRITES`.
    write_path: PathBuf,
    end: u64,
}

#[derive(Debug)]
struct CurrentEntry {
    header: EntryHeader,
    target: PathBuf,
    file: Option<OpenFile>,
}

/// [`DiskWriter`] that creates entries below a root directory.
///
/// # Examples
///
/// ```no_run
/// use tarmill_core::ExtractOptions;
/// use tarmill_core::extraction::FsDiskWriter;
///
/// let writer = FsDiskWriter::new("/tmp/out", ExtractOptions::default());
/// assert_eq!(writer.root().to_str(), Some("/tmp/out"));
/// ```
#[derive(Debug)]
pub struct FsDiskWriter {
    root: PathBuf,
    options: ExtractOptions,
    current: Option<CurrentEntry>,
    deferred_directories: Vec<(PathBuf, EntryHeader)>,
}

impl FsDiskWriter {
    /// Creates a writer placing entries below `root`.
    pub fn new(root: impl Into<PathBuf>, options: ExtractOptions) -> Self {
        if options.intersects(ExtractOptions::METADATA_ONLY) {
            log::debug!(
                "{:?}: ACL, file flag, xattr and HFS bits have nothing to restore from ustar",
                options & ExtractOptions::METADATA_ONLY
            );
        }
        Self {
            root: root.into(),
            options,
            current: None,
            deferred_directories: Vec::new(),
        }
    }

    /// Directory entries are created under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Options the writer applies.
    #[must_use]
    pub const fn options(&self) -> ExtractOptions {
        self.options
    }

    fn has(&self, flag: ExtractOptions) -> bool {
        self.options.contains(flag)
    }

    /// Maps an entry name to a path relative to the root. `None` names the
    /// root itself.
    fn relative_path(&self, name: &Path) -> Step<Option<PathBuf>> {
        let mut relative = PathBuf::new();
        for component in name.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => {
                    if self.has(ExtractOptions::SECURE_NOABSOLUTEPATHS) {
                        return Err(Status::failed(format!(
                            "{}: absolute path refused",
                            name.display()
                        )));
                    }
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if self.has(ExtractOptions::SECURE_NODOTDOT) {
                        return Err(Status::failed(format!(
                            "{}: path contains '..'",
                            name.display()
                        )));
                    }
                    relative.push("..");
                }
                Component::Normal(part) => relative.push(part),
            }
        }
        Ok((!relative.as_os_str().is_empty()).then_some(relative))
    }

    /// Refuses to write through a symlinked ancestor, or removes it under
    /// `UNLINK`.
    fn check_symlinked_ancestors(&self, relative: &Path) -> Step<()> {
        let Some(parent) = relative.parent() else {
            return Ok(());
        };
        let mut current = self.root.clone();
        for component in parent.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    if !self.has(ExtractOptions::UNLINK) {
                        return Err(Status::failed(format!(
                            "{}: cannot extract through symlink {}",
                            relative.display(),
                            current.display()
                        )));
                    }
                    fs::remove_file(&current)
                        .map_err(|e| Status::from_write_error(&current.display().to_string(), &e))?;
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(Status::from_write_error(&current.display().to_string(), &e)),
            }
        }
        Ok(())
    }

    fn prepare_parent(&self, target: &Path) -> Step<()> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };
        if parent.is_dir() {
            return Ok(());
        }
        if self.has(ExtractOptions::NO_AUTODIR) {
            return Err(Status::failed(format!(
                "{}: parent directory does not exist",
                target.display()
            )));
        }
        fs::create_dir_all(parent)
            .map_err(|e| Status::from_write_error(&parent.display().to_string(), &e))
    }

    /// Handles whatever already sits at `target`. Returns `true` when an
    /// existing directory should be reused.
    fn clear_target(&self, target: &Path, header: &EntryHeader) -> Step<bool> {
        let existing = match fs::symlink_metadata(target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Status::from_write_error(&target.display().to_string(), &e)),
        };
        let existing_dir = existing.file_type().is_dir();
        let reuse_dir = existing_dir && header.kind.is_directory();
        if reuse_dir {
            return Ok(true);
        }

        if self.has(ExtractOptions::NO_OVERWRITE) {
            return Err(Status::warn(format!("{}: already exists", target.display())));
        }
        if self.has(ExtractOptions::NO_OVERWRITE_NEWER) {
            let existing_mtime = FileTime::from_last_modification_time(&existing);
            let existing_secs = u64::try_from(existing_mtime.unix_seconds()).unwrap_or(0);
            if existing_secs >= header.mtime {
                return Err(Status::warn(format!(
                    "{}: existing file is not older than the entry",
                    target.display()
                )));
            }
        }

        if existing_dir {
            return fs::remove_dir(target)
                .map(|()| false)
                .map_err(|e| {
                    Status::failed(format!("{}: cannot replace directory: {e}", target.display()))
                });
        }
        // A regular file written under SAFE_WRITES replaces the old one by
        // rename.
        if header.kind.is_file()
            && self.has(ExtractOptions::SAFE_WRITES)
            && !self.has(ExtractOptions::UNLINK)
        {
            return Ok(false);
        }
        fs::remove_file(target)
            .map(|()| false)
            .map_err(|e| Status::from_write_error(&target.display().to_string(), &e))
    }

    fn create_directory(&mut self, target: &Path, header: &EntryHeader, exists: bool) -> Step<()> {
        if !exists {
            let mut builder = fs::DirBuilder::new();
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                // Owner rwx until close so children can be written.
                builder.mode((header.mode & 0o777) | 0o700);
            }
            match builder.create(target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && target.is_dir() => {}
                Err(e) => return Err(Status::from_write_error(&target.display().to_string(), &e)),
            }
        }
        self.deferred_directories
            .push((target.to_path_buf(), header.clone()));
        Ok(())
    }

    fn create_file(&self, target: &Path, header: &EntryHeader) -> Step<OpenFile> {
        let write_path = if self.has(ExtractOptions::SAFE_WRITES) {
            temporary_sibling(target)
        } else {
            target.to_path_buf()
        };
        let mut open = fs::OpenOptions::new();
        open.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(header.mode & 0o777);
        }
        #[cfg(not(unix))]
        let _ = header;
        let file = open
            .open(&write_path)
            .map_err(|e| Status::from_write_error(&write_path.display().to_string(), &e))?;
        Ok(OpenFile {
            file,
            write_path,
            end: 0,
        })
    }

    fn create_hardlink(&self, target: &Path, header: &EntryHeader) -> Step<()> {
        let Some(link) = header.link_target.as_deref() else {
            return Err(Status::warn(format!("{}: hard link without target", target.display())));
        };
        let source = match self.relative_path(link)? {
            Some(relative) => self.root.join(relative),
            None => self.root.clone(),
        };
        fs::hard_link(&source, target).map_err(|e| {
            Status::warn(format!(
                "{}: cannot link to {}: {e}",
                target.display(),
                source.display()
            ))
        })
    }

    /// Applies owner, mode and mtime according to the options. Problems are
    /// gathered into one warning.
    fn apply_metadata(&self, path: &Path, header: &EntryHeader) -> Step<()> {
        let mut problems = Vec::new();
        let is_symlink = header.kind.is_symlink();

        #[cfg(unix)]
        if self.has(ExtractOptions::OWNER) {
            let uid = u32::try_from(header.uid).ok();
            let gid = u32::try_from(header.gid).ok();
            let chown = if is_symlink {
                std::os::unix::fs::lchown(path, uid, gid)
            } else {
                std::os::unix::fs::chown(path, uid, gid)
            };
            if let Err(e) = chown {
                problems.push(format!("cannot set owner: {e}"));
            }
        }

        #[cfg(unix)]
        if self.has(ExtractOptions::PERM) && !is_symlink {
            use std::os::unix::fs::PermissionsExt;
            let mask = if self.has(ExtractOptions::OWNER) {
                0o7777
            } else {
                0o777
            };
            let permissions = fs::Permissions::from_mode(header.mode & mask);
            if let Err(e) = fs::set_permissions(path, permissions) {
                problems.push(format!("cannot set mode {:o}: {e}", header.mode & mask));
            }
        }

        if self.has(ExtractOptions::TIME) {
            let mtime = FileTime::from_unix_time(i64::try_from(header.mtime).unwrap_or(i64::MAX), 0);
            let result = if is_symlink {
                filetime::set_symlink_file_times(path, mtime, mtime)
            } else {
                filetime::set_file_mtime(path, mtime)
            };
            if let Err(e) = result {
                problems.push(format!("cannot set mtime: {e}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Status::warn(format!(
                "{}: {}",
                path.display(),
                problems.join("; ")
            )))
        }
    }
}

impl DiskWriter for FsDiskWriter {
    fn write_header(&mut self, header: &EntryHeader) -> Step<()> {
        self.abort_entry();

        let target = match self.relative_path(&header.path)? {
            Some(relative) => {
                if self.has(ExtractOptions::SECURE_SYMLINKS) {
                    self.check_symlinked_ancestors(&relative)?;
                }
                self.root.join(relative)
            }
            None if header.kind.is_directory() => self.root.clone(),
            None => {
                return Err(Status::warn(format!(
                    "{}: entry has no usable name",
                    header.path.display()
                )));
            }
        };
        self.prepare_parent(&target)?;
        let reuse_dir = self.clear_target(&target, header)?;

        let mut file = None;
        match header.kind {
            EntryKind::Directory => self.create_directory(&target, header, reuse_dir)?,
            EntryKind::File => file = Some(self.create_file(&target, header)?),
            EntryKind::Symlink => {
                let Some(link) = header.link_target.as_deref() else {
                    return Err(Status::warn(format!("{}: symlink without target", target.display())));
                };
                create_symlink(link, &target)?;
            }
            EntryKind::Hardlink => self.create_hardlink(&target, header)?,
            other => {
                return Err(Status::warn(format!(
                    "{}: cannot recreate {}",
                    target.display(),
                    other.label()
                )));
            }
        }

        self.current = Some(CurrentEntry {
            header: header.clone(),
            target,
            file,
        });
        Ok(())
    }

    fn write_data_block(&mut self, data: &[u8], offset: u64) -> Step<()> {
        let sparse = self.has(ExtractOptions::SPARSE);
        let Some(open) = self.current.as_mut().and_then(|c| c.file.as_mut()) else {
            return Ok(());
        };
        let end = offset + data.len() as u64;
        if !(sparse && data.iter().all(|&b| b == 0)) {
            let context = open.write_path.display().to_string();
            open.file
                .seek(SeekFrom::Start(offset))
                .and_then(|_| open.file.write_all(data))
                .map_err(|e| Status::from_write_error(&context, &e))?;
        }
        open.end = open.end.max(end);
        Ok(())
    }

    fn finish_entry(&mut self) -> Step<()> {
        let Some(entry) = self.current.take() else {
            return Ok(());
        };

        if let Some(open) = entry.file {
            let context = open.write_path.display().to_string();
            // Trailing holes are not written; extend to the full length.
            open.file
                .set_len(open.end)
                .map_err(|e| Status::from_write_error(&context, &e))?;
            drop(open.file);
            if open.write_path != entry.target {
                fs::rename(&open.write_path, &entry.target)
                    .map_err(|e| Status::from_write_error(&context, &e))?;
            }
        }

        match entry.header.kind {
            EntryKind::Directory | EntryKind::Hardlink => Ok(()),
            _ => self.apply_metadata(&entry.target, &entry.header),
        }
    }

    fn abort_entry(&mut self) {
        let Some(entry) = self.current.take() else {
            return;
        };
        if let Some(open) = entry.file
            && open.write_path != entry.target
        {
            drop(open.file);
            if let Err(e) = fs::remove_file(&open.write_path) {
                log::warn!(
                    "failed to remove temporary file {}: {e}",
                    open.write_path.display()
                );
            }
        }
    }

    fn close(&mut self) -> Step<()> {
        self.abort_entry();

        // Deepest first so a read-only parent is fixed up after its children.
        let mut directories = std::mem::take(&mut self.deferred_directories);
        directories.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        let mut problems = Vec::new();
        for (path, header) in &directories {
            if let Err(status) = self.apply_metadata(path, header) {
                problems.push(status.message);
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Status::warn(problems.join("; ")))
        }
    }
}

fn temporary_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "entry".into(), |n| n.to_string_lossy());
    target.with_file_name(format!(".{name}.tarmill-{}", std::process::id()))
}

#[cfg(unix)]
fn create_symlink(link: &Path, target: &Path) -> Step<()> {
    std::os::unix::fs::symlink(link, target)
        .map_err(|e| Status::from_write_error(&target.display().to_string(), &e))
}

#[cfg(not(unix))]
fn create_symlink(_link: &Path, target: &Path) -> Step<()> {
    Err(Status::warn(format!(
        "{}: symlinks are not supported on this platform",
        target.display()
    )))
}
