//! Configuration for archive construction and extraction.

use crate::ArchiveError;
use crate::Result;
use crate::codec::CompressionType;
use std::fmt;
use std::ops::BitAnd;
use std::ops::BitOr;
use std::ops::BitOrAssign;

/// Options fixed for the lifetime of one [`ArchiveBuilder`].
///
/// # Examples
///
/// ```
/// use tarmill_core::ArchiveOptions;
/// use tarmill_core::CompressionType;
///
/// let options = ArchiveOptions::default()
///     .with_compression(CompressionType::Xz)
///     .with_dereference_symlinks(true)
///     .with_compression_level(9);
/// assert!(options.validate().is_ok());
/// ```
///
/// [`ArchiveBuilder`]: crate::ArchiveBuilder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Compression filter installed on the archive stream.
    ///
    /// Default: [`CompressionType::Gzip`].
    pub compression: CompressionType,

    /// Compression level (1-9). `None` uses the codec default.
    ///
    /// Ignored by filters without a level (lz4, uu).
    pub compression_level: Option<u8>,

    /// Store what a symlink points at instead of the link itself.
    ///
    /// Default: `false`.
    pub dereference_symlinks: bool,

    /// Keep the on-disk mode of regular files.
    ///
    /// When `false`, files are normalized to `0o777` if the owner execute bit
    /// is set and `0o666` otherwise.
    pub preserve_file_permissions: bool,

    /// Keep the on-disk mode of directories. When `false`, `0o755` is stored.
    pub preserve_directory_permissions: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Gzip,
            compression_level: None,
            dereference_symlinks: false,
            preserve_file_permissions: false,
            preserve_directory_permissions: false,
        }
    }
}

impl ArchiveOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression filter.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the compression level. Out-of-range values are reported by
    /// [`validate`](Self::validate).
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Sets whether symlinks are followed.
    #[must_use]
    pub fn with_dereference_symlinks(mut self, dereference: bool) -> Self {
        self.dereference_symlinks = dereference;
        self
    }

    /// Sets whether file modes are stored verbatim.
    #[must_use]
    pub fn with_preserve_file_permissions(mut self, preserve: bool) -> Self {
        self.preserve_file_permissions = preserve;
        self
    }

    /// Sets whether directory modes are stored verbatim.
    #[must_use]
    pub fn with_preserve_directory_permissions(mut self, preserve: bool) -> Self {
        self.preserve_directory_permissions = preserve;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error if the compression level is set but not in 1-9.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.compression_level
            && !(1..=9).contains(&level)
        {
            return Err(ArchiveError::InvalidConfiguration(format!(
                "compression level must be 1-9, got {level}"
            )));
        }
        Ok(())
    }
}

/// Bit-set of preservation and safety flags applied when writing extracted
/// entries to disk.
///
/// The default preserves modification times, file flags, permissions and
/// ACLs. Everything else is opt-in.
///
/// # Examples
///
/// ```
/// use tarmill_core::ExtractOptions;
///
/// let options = ExtractOptions::default() | ExtractOptions::NO_OVERWRITE;
/// assert!(options.contains(ExtractOptions::TIME));
/// assert!(options.contains(ExtractOptions::NO_OVERWRITE));
/// assert!(!options.contains(ExtractOptions::OWNER));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtractOptions(u32);

impl ExtractOptions {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Restore owner and group.
    pub const OWNER: Self = Self(0x0001);
    /// Restore the exact permission bits.
    pub const PERM: Self = Self(0x0002);
    /// Restore modification time.
    pub const TIME: Self = Self(0x0004);
    /// Never replace an existing file.
    pub const NO_OVERWRITE: Self = Self(0x0008);
    /// Remove an existing file before creating the new one.
    pub const UNLINK: Self = Self(0x0010);
    /// Restore access control lists.
    pub const ACL: Self = Self(0x0020);
    /// Restore file flags.
    pub const FFLAGS: Self = Self(0x0040);
    /// Restore extended attributes.
    pub const XATTR: Self = Self(0x0080);
    /// Refuse to write through a symlinked parent directory.
    pub const SECURE_SYMLINKS: Self = Self(0x0100);
    /// Refuse paths containing `..`.
    pub const SECURE_NODOTDOT: Self = Self(0x0200);
    /// Do not create missing parent directories.
    pub const NO_AUTODIR: Self = Self(0x0400);
    /// Never replace an existing file that is newer than the entry.
    pub const NO_OVERWRITE_NEWER: Self = Self(0x0800);
    /// Turn runs of zero blocks into holes.
    pub const SPARSE: Self = Self(0x1000);
    /// Restore macOS metadata.
    pub const MAC_METADATA: Self = Self(0x2000);
    /// Disable HFS+ compression.
    pub const NO_HFS_COMPRESSION: Self = Self(0x4000);
    /// Force HFS+ compression.
    pub const HFS_COMPRESSION_FORCED: Self = Self(0x8000);
    /// Refuse absolute paths.
    pub const SECURE_NOABSOLUTEPATHS: Self = Self(0x0001_0000);
    /// Clear no-change file flags before writing.
    pub const CLEAR_NOCHANGE_FFLAGS: Self = Self(0x0002_0000);
    /// Write to a temporary file and rename it into place.
    pub const SAFE_WRITES: Self = Self(0x0004_0000);

    /// Flags with nothing to restore from a ustar stream.
    pub(crate) const METADATA_ONLY: Self = Self(
        Self::ACL.0
            | Self::FFLAGS.0
            | Self::XATTR.0
            | Self::MAC_METADATA.0
            | Self::NO_HFS_COMPRESSION.0
            | Self::HFS_COMPRESSION_FORCED.0
            | Self::CLEAR_NOCHANGE_FFLAGS.0,
    );

    /// Builds a set from raw bits. Unknown bits are kept and ignored.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns a copy with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::TIME | Self::FFLAGS | Self::PERM | Self::ACL
    }
}

impl BitOr for ExtractOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ExtractOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ExtractOptions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtractOptions({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_options_default() {
        let options = ArchiveOptions::default();
        assert_eq!(options.compression, CompressionType::Gzip);
        assert_eq!(options.compression_level, None);
        assert!(!options.dereference_symlinks);
        assert!(!options.preserve_file_permissions);
        assert!(!options.preserve_directory_permissions);
    }

    #[test]
    fn test_archive_options_builder() {
        let options = ArchiveOptions::new()
            .with_compression(CompressionType::Bzip)
            .with_compression_level(3)
            .with_dereference_symlinks(true)
            .with_preserve_file_permissions(true)
            .with_preserve_directory_permissions(true);

        assert_eq!(options.compression, CompressionType::Bzip);
        assert_eq!(options.compression_level, Some(3));
        assert!(options.dereference_symlinks);
        assert!(options.preserve_file_permissions);
        assert!(options.preserve_directory_permissions);
    }

    #[test]
    fn test_archive_options_validate_level() {
        assert!(ArchiveOptions::default().validate().is_ok());
        assert!(
            ArchiveOptions::default()
                .with_compression_level(9)
                .validate()
                .is_ok()
        );

        let err = ArchiveOptions::default()
            .with_compression_level(0)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(
            ArchiveOptions::default()
                .with_compression_level(10)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_extract_options_default() {
        let options = ExtractOptions::default();
        assert_eq!(options.bits(), 0x4 | 0x40 | 0x2 | 0x20);
        assert!(options.contains(ExtractOptions::TIME));
        assert!(options.contains(ExtractOptions::FFLAGS));
        assert!(options.contains(ExtractOptions::PERM));
        assert!(options.contains(ExtractOptions::ACL));
        assert!(!options.contains(ExtractOptions::OWNER));
        assert!(!options.contains(ExtractOptions::SPARSE));
        assert!(!options.contains(ExtractOptions::SECURE_SYMLINKS));
    }

    #[test]
    fn test_extract_options_combine() {
        let mut options = ExtractOptions::NONE | ExtractOptions::UNLINK;
        options |= ExtractOptions::SAFE_WRITES;
        assert_eq!(options.bits(), 0x10 | 0x0004_0000);
        assert!(options.intersects(ExtractOptions::UNLINK | ExtractOptions::OWNER));
        assert!(!options.contains(ExtractOptions::UNLINK | ExtractOptions::OWNER));

        let cleared = options.without(ExtractOptions::UNLINK);
        assert!(!cleared.contains(ExtractOptions::UNLINK));
        assert_eq!((options & ExtractOptions::SAFE_WRITES).bits(), 0x0004_0000);
    }

    #[test]
    fn test_extract_options_debug() {
        assert_eq!(
            format!("{:?}", ExtractOptions::from_bits(0x201)),
            "ExtractOptions(0x201)"
        );
    }
}
