//! Filesystem metadata probing under a symlink dereference policy.
//!
//! With dereferencing off, every query uses "don't follow" semantics, so a
//! symlink is reported as a symlink. With dereferencing on, queries follow
//! the link and describe its target; `is_symlink` is then always `false`.

use crate::types::EntryKind;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// Metadata captured for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Kind of object.
    pub kind: EntryKind,
    /// Permission bits (`0o7777` mask).
    pub mode: u32,
    /// Content size in bytes; zero for everything except regular files.
    pub size: u64,
    /// Modification time in whole seconds since the Unix epoch, clamped at 0.
    pub mtime: u64,
    /// Owner user id.
    pub uid: u64,
    /// Owner group id.
    pub gid: u64,
    /// Device major/minor numbers for character and block devices.
    pub device: Option<(u32, u32)>,
    /// Link target, present only for symlinks.
    pub symlink_target: Option<PathBuf>,
}

impl FileMetadata {
    fn from_std(metadata: &fs::Metadata) -> Self {
        let kind = EntryKind::from_file_type(metadata.file_type());
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        let size = if kind.has_content() { metadata.len() } else { 0 };

        #[cfg(unix)]
        let (mode, uid, gid, device) = {
            use std::os::unix::fs::MetadataExt;
            let device = matches!(kind, EntryKind::CharDevice | EntryKind::BlockDevice)
                .then(|| split_device(metadata.rdev()));
            (
                metadata.mode() & 0o7777,
                u64::from(metadata.uid()),
                u64::from(metadata.gid()),
                device,
            )
        };

        #[cfg(not(unix))]
        let (mode, uid, gid, device) = {
            let mode = match kind {
                EntryKind::Directory => 0o755,
                _ if metadata.permissions().readonly() => 0o444,
                _ => 0o644,
            };
            (mode, 0, 0, None)
        };

        Self {
            kind,
            mode,
            size,
            mtime,
            uid,
            gid,
            device,
            symlink_target: None,
        }
    }

    /// Returns `true` if the owner execute bit is set.
    #[must_use]
    pub const fn is_owner_executable(&self) -> bool {
        self.mode & 0o100 != 0
    }
}

#[cfg(unix)]
#[allow(clippy::cast_possible_truncation)]
const fn split_device(rdev: u64) -> (u32, u32) {
    // glibc encoding; Linux and the BSDs agree on the low 20 bits.
    let major = ((rdev >> 8) & 0xfff) | ((rdev >> 32) & !0xfff);
    let minor = (rdev & 0xff) | ((rdev >> 12) & !0xff);
    (major as u32, minor as u32)
}

/// Reads metadata for paths, following symlinks only when configured to.
///
/// # Examples
///
/// ```no_run
/// use tarmill_core::probe::MetadataProbe;
///
/// let probe = MetadataProbe::new(false);
/// if probe.is_symlink("current") {
///     println!("-> {}", probe.read_symlink_target("current"));
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataProbe {
    dereference: bool,
}

impl MetadataProbe {
    /// Creates a probe with the given dereference policy.
    #[must_use]
    pub const fn new(dereference: bool) -> Self {
        Self { dereference }
    }

    /// Returns `true` if symlinks are followed.
    #[must_use]
    pub const fn dereferences(&self) -> bool {
        self.dereference
    }

    fn stat(&self, path: &Path) -> io::Result<fs::Metadata> {
        if self.dereference {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
    }

    /// Reads metadata for `path`, including the link target for symlinks.
    pub fn probe(&self, path: impl AsRef<Path>) -> io::Result<FileMetadata> {
        let path = path.as_ref();
        let mut metadata = FileMetadata::from_std(&self.stat(path)?);
        if metadata.kind.is_symlink() {
            metadata.symlink_target = Some(fs::read_link(path)?);
        }
        Ok(metadata)
    }

    /// Returns `true` if `path` is a directory under this probe's policy.
    /// Unreadable paths are not directories.
    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        self.stat(path.as_ref()).is_ok_and(|m| m.is_dir())
    }

    /// Returns `true` if `path` is a symlink under this probe's policy.
    /// Unreadable paths are not symlinks.
    pub fn is_symlink(&self, path: impl AsRef<Path>) -> bool {
        self.stat(path.as_ref())
            .is_ok_and(|m| m.file_type().is_symlink())
    }

    /// Returns the link target of `path`, or an empty string if it is not a
    /// symlink or the target cannot be read.
    ///
    /// An empty result is not an error signal; check
    /// [`is_symlink`](Self::is_symlink) first.
    pub fn read_symlink_target(&self, path: impl AsRef<Path>) -> String {
        fs::read_link(path.as_ref())
            .map(|target| target.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
