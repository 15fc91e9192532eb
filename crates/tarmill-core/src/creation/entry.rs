//! Emission of a single archive entry: header plus, for regular files, the
//! streamed content body.

use crate::ArchiveError;
use crate::ArchiveOptions;
use crate::Result;
use crate::probe::FileMetadata;
use crate::types::EntryKind;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tar::Builder;
use tar::Header;

/// Size of each read from a source file while streaming its content.
pub const CONTENT_CHUNK_SIZE: usize = 1024;

const EXECUTABLE_FILE_MODE: u32 = 0o777;
const PLAIN_FILE_MODE: u32 = 0o666;
const DIRECTORY_MODE: u32 = 0o755;
const SYMLINK_MODE: u32 = 0o777;

/// One logical entry to be written: where it lives on disk, what it is
/// called inside the archive, and what the probe saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntryDescriptor {
    /// Source path on disk.
    pub disk_path: PathBuf,
    /// Name inside the archive, `/`-separated.
    pub archive_path: String,
    /// Probed metadata.
    pub metadata: FileMetadata,
}

impl ArchiveEntryDescriptor {
    /// Builds a descriptor.
    pub fn new(
        disk_path: impl Into<PathBuf>,
        archive_path: impl Into<String>,
        metadata: FileMetadata,
    ) -> Self {
        Self {
            disk_path: disk_path.into(),
            archive_path: archive_path.into(),
            metadata,
        }
    }

    /// Kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.metadata.kind
    }
}

/// What [`write_entry`] did with a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryWritten {
    /// An entry was appended, with this many content bytes.
    Appended {
        /// Kind of the appended entry.
        kind: EntryKind,
        /// Content bytes streamed.
        bytes: u64,
    },
    /// A directory mapped to the archive root itself; no entry is needed.
    RootOmitted,
    /// Nothing was appended.
    Skipped {
        /// Why the entry was left out.
        reason: String,
    },
}

/// Returns the mode stored in the header after applying the normalization
/// policy of `options`.
///
/// # Examples
///
/// ```
/// use tarmill_core::ArchiveOptions;
/// use tarmill_core::EntryKind;
/// use tarmill_core::creation::entry::stored_mode;
///
/// let options = ArchiveOptions::default();
/// assert_eq!(stored_mode(EntryKind::File, 0o750, &options), 0o777);
/// assert_eq!(stored_mode(EntryKind::File, 0o640, &options), 0o666);
/// assert_eq!(stored_mode(EntryKind::Directory, 0o700, &options), 0o755);
/// ```
#[must_use]
pub fn stored_mode(kind: EntryKind, mode: u32, options: &ArchiveOptions) -> u32 {
    match kind {
        EntryKind::Symlink => SYMLINK_MODE,
        EntryKind::Directory if !options.preserve_directory_permissions => DIRECTORY_MODE,
        EntryKind::Directory => mode,
        _ if options.preserve_file_permissions => mode,
        _ if mode & 0o100 != 0 => EXECUTABLE_FILE_MODE,
        _ => PLAIN_FILE_MODE,
    }
}

/// Strips leading `/` and `./` segments so the name is relative, as the
/// tar writer requires.
#[must_use]
pub fn relative_archive_path(path: &str) -> &str {
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else {
            return rest;
        }
    }
}

/// Appends one entry to `builder`.
///
/// Regular file content is read in [`CONTENT_CHUNK_SIZE`] chunks, capped at
/// the probed size. If a read fails part-way, the error is returned as
/// [`ArchiveError::ContentRead`]; whatever was already appended stays in the
/// archive and the archive should be discarded.
pub fn write_entry<W: Write>(
    builder: &mut Builder<W>,
    descriptor: &ArchiveEntryDescriptor,
    options: &ArchiveOptions,
) -> Result<EntryWritten> {
    let metadata = &descriptor.metadata;
    let kind = metadata.kind;
    let Some(entry_type) = kind.to_tar() else {
        log::warn!(
            "skipping {}: {kind} entries cannot be archived",
            descriptor.disk_path.display()
        );
        return Ok(EntryWritten::Skipped {
            reason: format!("{kind} cannot be archived"),
        });
    };

    let mut name = relative_archive_path(&descriptor.archive_path).to_string();
    if kind.is_directory() && !name.is_empty() && !name.ends_with('/') {
        name.push('/');
    }
    if name.is_empty() {
        if kind.is_directory() {
            log::debug!(
                "not emitting a directory entry for {}: empty archive name",
                descriptor.disk_path.display()
            );
            return Ok(EntryWritten::RootOmitted);
        }
        return Err(ArchiveError::InvalidPath {
            path: descriptor.disk_path.clone(),
        });
    }

    let mut header = Header::new_ustar();
    header.set_entry_type(entry_type);
    header.set_mode(stored_mode(kind, metadata.mode, options));
    header.set_uid(metadata.uid);
    header.set_gid(metadata.gid);
    header.set_mtime(metadata.mtime);

    match kind {
        EntryKind::Symlink => {
            let target = metadata
                .symlink_target
                .as_deref()
                .unwrap_or_else(|| Path::new(""));
            header.set_size(0);
            builder.append_link(&mut header, &name, target)?;
            Ok(EntryWritten::Appended { kind, bytes: 0 })
        }
        EntryKind::File => {
            let file = File::open(&descriptor.disk_path).map_err(|source| ArchiveError::Open {
                path: descriptor.disk_path.clone(),
                source,
            })?;
            header.set_size(metadata.size);
            let mut content = ContentReader::new(file, metadata.size);
            match builder.append_data(&mut header, &name, &mut content) {
                Ok(()) => Ok(EntryWritten::Appended {
                    kind,
                    bytes: metadata.size,
                }),
                Err(source) if content.failed => Err(ArchiveError::ContentRead {
                    path: descriptor.disk_path.clone(),
                    source,
                }),
                Err(e) => Err(e.into()),
            }
        }
        _ => {
            if let Some((major, minor)) = metadata.device {
                header.set_device_major(major)?;
                header.set_device_minor(minor)?;
            }
            header.set_size(0);
            builder.append_data(&mut header, &name, io::empty())?;
            Ok(EntryWritten::Appended { kind, bytes: 0 })
        }
    }
}

/// Reads at most `remaining` bytes in [`CONTENT_CHUNK_SIZE`] pieces and
/// fails if the source ends early, so the body always matches the header.
struct ContentReader<R> {
    inner: R,
    remaining: u64,
    failed: bool,
}

impl<R: Read> ContentReader<R> {
    const fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
            failed: false,
        }
    }
}

impl<R: Read> Read for ContentReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = buf
            .len()
            .min(CONTENT_CHUNK_SIZE)
            .min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let read = match self.inner.read(&mut buf[..want]) {
            Ok(0) => {
                self.failed = true;
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file shrank with {} bytes still expected", self.remaining),
                ));
            }
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };
        self.remaining -= read as u64;
        Ok(read)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::probe::MetadataProbe;
    use std::fs;
    use tempfile::TempDir;

    fn read_back(bytes: Vec<u8>) -> Vec<(String, tar::EntryType, u32, Vec<u8>)> {
        let mut archive = tar::Archive::new(io::Cursor::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let mut entry = entry.unwrap();
                let path = String::from_utf8(entry.path_bytes().into_owned()).unwrap();
                let entry_type = entry.header().entry_type();
                let mode = entry.header().mode().unwrap();
                let mut body = Vec::new();
                entry.read_to_end(&mut body).unwrap();
                (path, entry_type, mode, body)
            })
            .collect()
    }

    fn descriptor(path: &Path, name: &str, dereference: bool) -> ArchiveEntryDescriptor {
        let metadata = MetadataProbe::new(dereference).probe(path).unwrap();
        ArchiveEntryDescriptor::new(path, name, metadata)
    }

    #[test]
    fn test_relative_archive_path() {
        assert_eq!(relative_archive_path("/etc/hosts"), "etc/hosts");
        assert_eq!(relative_archive_path("./a/b"), "a/b");
        assert_eq!(relative_archive_path("/./x"), "x");
        assert_eq!(relative_archive_path("a/./b"), "a/./b");
        assert_eq!(relative_archive_path("/"), "");
    }

    #[test]
    fn test_stored_mode_preserve() {
        let options = ArchiveOptions::default()
            .with_preserve_file_permissions(true)
            .with_preserve_directory_permissions(true);
        assert_eq!(stored_mode(EntryKind::File, 0o640, &options), 0o640);
        assert_eq!(stored_mode(EntryKind::Directory, 0o700, &options), 0o700);
        assert_eq!(stored_mode(EntryKind::Symlink, 0o755, &options), 0o777);
    }

    #[test]
    fn test_file_entry_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        let content = b"0123456789".repeat(250);
        fs::write(&path, &content).unwrap();

        let mut builder = Builder::new(Vec::new());
        let written = write_entry(
            &mut builder,
            &descriptor(&path, "/data/a.txt", false),
            &ArchiveOptions::default(),
        )
        .unwrap();
        assert_eq!(
            written,
            EntryWritten::Appended {
                kind: EntryKind::File,
                bytes: 2500
            }
        );

        let entries = read_back(builder.into_inner().unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "data/a.txt");
        assert_eq!(entries[0].1, tar::EntryType::Regular);
        assert_eq!(entries[0].3, content);
    }

    #[test]
    fn test_directory_entry_has_trailing_slash() {
        let temp = TempDir::new().unwrap();
        let mut builder = Builder::new(Vec::new());
        write_entry(
            &mut builder,
            &descriptor(temp.path(), "backup", false),
            &ArchiveOptions::default(),
        )
        .unwrap();

        let entries = read_back(builder.into_inner().unwrap());
        assert_eq!(entries[0].0, "backup/");
        assert_eq!(entries[0].1, tar::EntryType::Directory);
        assert_eq!(entries[0].2, 0o755);
        assert!(entries[0].3.is_empty());
    }

    #[test]
    fn test_directory_with_empty_name_is_omitted() {
        let temp = TempDir::new().unwrap();
        let mut builder = Builder::new(Vec::new());
        let written = write_entry(
            &mut builder,
            &descriptor(temp.path(), "", false),
            &ArchiveOptions::default(),
        )
        .unwrap();
        assert_eq!(written, EntryWritten::RootOmitted);
        assert!(read_back(builder.into_inner().unwrap()).is_empty());
    }

    #[test]
    fn test_file_with_empty_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        fs::write(&path, b"x").unwrap();
        let mut builder = Builder::new(Vec::new());
        let err = write_entry(
            &mut builder,
            &descriptor(&path, "/", false),
            &ArchiveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPath { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_normalization() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let exec = temp.path().join("run");
        let plain = temp.path().join("plain");
        fs::write(&exec, b"#!").unwrap();
        fs::write(&plain, b"x").unwrap();
        fs::set_permissions(&exec, fs::Permissions::from_mode(0o700)).unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o600)).unwrap();

        let mut builder = Builder::new(Vec::new());
        let options = ArchiveOptions::default();
        write_entry(&mut builder, &descriptor(&exec, "run", false), &options).unwrap();
        write_entry(&mut builder, &descriptor(&plain, "plain", false), &options).unwrap();

        let entries = read_back(builder.into_inner().unwrap());
        assert_eq!(entries[0].2, 0o777);
        assert_eq!(entries[1].2, 0o666);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entry_stores_target() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"hello").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("a.txt", &link).unwrap();

        let mut builder = Builder::new(Vec::new());
        write_entry(
            &mut builder,
            &descriptor(&link, "link", false),
            &ArchiveOptions::default(),
        )
        .unwrap();

        let bytes = builder.into_inner().unwrap();
        let mut archive = tar::Archive::new(io::Cursor::new(bytes));
        let mut entries = archive.entries().unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.header().entry_type(), tar::EntryType::Symlink);
        assert_eq!(
            entry.link_name().unwrap().unwrap().as_ref(),
            Path::new("a.txt")
        );
        assert_eq!(entry.header().size().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_dereferenced_symlink_stores_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"hello").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("a.txt", &link).unwrap();

        let mut builder = Builder::new(Vec::new());
        write_entry(
            &mut builder,
            &descriptor(&link, "link", true),
            &ArchiveOptions::default(),
        )
        .unwrap();

        let entries = read_back(builder.into_inner().unwrap());
        assert_eq!(entries[0].1, tar::EntryType::Regular);
        assert_eq!(entries[0].3, b"hello");
    }

    #[test]
    fn test_file_shrinking_is_a_content_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shrinks");
        fs::write(&path, vec![1u8; 4096]).unwrap();
        let entry = descriptor(&path, "shrinks", false);
        fs::write(&path, vec![1u8; 100]).unwrap();

        let mut builder = Builder::new(Vec::new());
        let err = write_entry(&mut builder, &entry, &ArchiveOptions::default()).unwrap_err();
        assert!(matches!(err, ArchiveError::ContentRead { .. }));
    }

    #[test]
    fn test_content_reader_chunks() {
        let data = vec![9u8; 5000];
        let mut reader = ContentReader::new(&data[..], 3000);
        let mut buf = [0u8; 8192];
        assert_eq!(reader.read(&mut buf).unwrap(), CONTENT_CHUNK_SIZE);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest.len(), 3000 - CONTENT_CHUNK_SIZE);
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_is_skipped() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("s.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&socket_path).unwrap();

        let mut builder = Builder::new(Vec::new());
        let written = write_entry(
            &mut builder,
            &descriptor(&socket_path, "s.sock", false),
            &ArchiveOptions::default(),
        )
        .unwrap();
        assert!(matches!(written, EntryWritten::Skipped { .. }));
    }
}
