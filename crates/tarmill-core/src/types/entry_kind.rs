//! Kind of filesystem object an archive entry describes.

use std::fmt;
use std::fs::FileType;

/// Kind of an archive entry, on disk or in the stream.
///
/// # Examples
///
/// ```
/// use tarmill_core::EntryKind;
///
/// assert_eq!(EntryKind::from_tar(tar::EntryType::Symlink), EntryKind::Symlink);
/// assert!(EntryKind::Directory.is_directory());
/// assert!(!EntryKind::Fifo.has_content());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Hard link to an earlier entry.
    Hardlink,
    /// Named pipe.
    Fifo,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Unix domain socket; not representable in ustar.
    Socket,
}

impl EntryKind {
    /// Classifies a `std::fs::FileType`.
    #[must_use]
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_dir() {
            return Self::Directory;
        }
        if file_type.is_symlink() {
            return Self::Symlink;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_fifo() {
                return Self::Fifo;
            }
            if file_type.is_char_device() {
                return Self::CharDevice;
            }
            if file_type.is_block_device() {
                return Self::BlockDevice;
            }
            if file_type.is_socket() {
                return Self::Socket;
            }
        }
        Self::File
    }

    /// Classifies a tar header type. GNU sparse and contiguous files count as
    /// regular files; metadata-only headers also map to `File` since the
    /// `tar` crate consumes them before yielding an entry.
    #[must_use]
    pub fn from_tar(entry_type: tar::EntryType) -> Self {
        match entry_type {
            tar::EntryType::Directory => Self::Directory,
            tar::EntryType::Symlink => Self::Symlink,
            tar::EntryType::Link => Self::Hardlink,
            tar::EntryType::Fifo => Self::Fifo,
            tar::EntryType::Char => Self::CharDevice,
            tar::EntryType::Block => Self::BlockDevice,
            _ => Self::File,
        }
    }

    /// Returns the tar header type, or `None` for sockets.
    #[must_use]
    pub const fn to_tar(self) -> Option<tar::EntryType> {
        match self {
            Self::File => Some(tar::EntryType::Regular),
            Self::Directory => Some(tar::EntryType::Directory),
            Self::Symlink => Some(tar::EntryType::Symlink),
            Self::Hardlink => Some(tar::EntryType::Link),
            Self::Fifo => Some(tar::EntryType::Fifo),
            Self::CharDevice => Some(tar::EntryType::Char),
            Self::BlockDevice => Some(tar::EntryType::Block),
            Self::Socket => None,
        }
    }

    /// Returns `true` for regular files.
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File)
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns `true` for symlinks.
    #[must_use]
    pub const fn is_symlink(self) -> bool {
        matches!(self, Self::Symlink)
    }

    /// Returns `true` if entries of this kind carry a content body.
    #[must_use]
    pub const fn has_content(self) -> bool {
        matches!(self, Self::File)
    }

    /// Short lowercase label used in listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Hardlink => "hardlink",
            Self::Fifo => "fifo",
            Self::CharDevice => "char-device",
            Self::BlockDevice => "block-device",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
