//! In-memory archive fixtures for unit tests.
//!
//! Everything here panics on I/O errors; it is compiled for tests only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use crate::codec;
use crate::codec::CompressionType;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;

/// Builds tar streams entry by entry with explicit header fields.
pub struct TarTestBuilder {
    builder: tar::Builder<Vec<u8>>,
    mtime: u64,
}

impl TarTestBuilder {
    /// Starts an empty archive; entries get mtime 1_600_000_000.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
            mtime: 1_600_000_000,
        }
    }

    /// Sets the mtime of entries appended after this call.
    #[must_use]
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    fn append(
        mut self,
        entry_type: tar::EntryType,
        path: &str,
        mode: u32,
        link: Option<&str>,
        data: &[u8],
    ) -> Self {
        let mut header = tar::Header::new_ustar();
        header.set_entry_type(entry_type);
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_mtime(self.mtime);
        if let Some(target) = link {
            header.set_link_name(target).unwrap();
        }
        // Write the name straight into the header so names the builder
        // would reject (absolute, `..`) can be produced.
        let name = path.as_bytes();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Appends a regular file with mode 0644.
    #[must_use]
    pub fn add_file(self, path: &str, data: &[u8]) -> Self {
        self.append(tar::EntryType::Regular, path, 0o644, None, data)
    }

    /// Appends a regular file with the given mode.
    #[must_use]
    pub fn add_file_with_mode(self, path: &str, data: &[u8], mode: u32) -> Self {
        self.append(tar::EntryType::Regular, path, mode, None, data)
    }

    /// Appends a directory with mode 0755.
    #[must_use]
    pub fn add_directory(self, path: &str) -> Self {
        self.append(tar::EntryType::Directory, path, 0o755, None, &[])
    }

    /// Appends a directory with the given mode.
    #[must_use]
    pub fn add_directory_with_mode(self, path: &str, mode: u32) -> Self {
        self.append(tar::EntryType::Directory, path, mode, None, &[])
    }

    /// Appends a symlink.
    #[must_use]
    pub fn add_symlink(self, path: &str, target: &str) -> Self {
        self.append(tar::EntryType::Symlink, path, 0o777, Some(target), &[])
    }

    /// Appends a hard link to an earlier entry.
    #[must_use]
    pub fn add_hardlink(self, path: &str, target: &str) -> Self {
        self.append(tar::EntryType::Link, path, 0o644, Some(target), &[])
    }

    /// Appends a FIFO.
    #[must_use]
    pub fn add_fifo(self, path: &str) -> Self {
        self.append(tar::EntryType::Fifo, path, 0o644, None, &[])
    }

    /// Finishes the uncompressed stream.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }

    /// Finishes the stream and runs it through a compression filter.
    #[must_use]
    pub fn build_compressed(self, compression: CompressionType) -> Vec<u8> {
        let tar = self.build();
        let mut writer = codec::install(Vec::new(), compression, Some(1)).unwrap();
        writer.write_all(&tar).unwrap();
        writer.finish().unwrap()
    }

    /// Finishes the stream compressed with `compression` and writes it to
    /// `path`.
    pub fn write_to(self, path: &Path, compression: CompressionType) {
        std::fs::write(path, self.build_compressed(compression)).unwrap();
    }
}

impl Default for TarTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrites the 512-byte header at `offset` of an uncompressed tar stream
/// and recomputes its checksum.
pub fn patch_header(bytes: &mut [u8], offset: usize, edit: impl FnOnce(&mut tar::Header)) {
    let block = &mut bytes[offset..offset + 512];
    let mut header = tar::Header::new_old();
    header.as_mut_bytes().copy_from_slice(block);
    edit(&mut header);
    header.set_cksum();
    block.copy_from_slice(header.as_bytes());
}

/// Reader that fails once with `ErrorKind::Interrupted` when it reaches
/// byte `at`. Reads never cross `at` before the failure fires.
pub struct InterruptOnce<R> {
    inner: R,
    at: u64,
    pos: u64,
    fired: bool,
}

impl<R> InterruptOnce<R> {
    /// Wraps `inner`.
    pub const fn new(inner: R, at: u64) -> Self {
        Self {
            inner,
            at,
            pos: 0,
            fired: false,
        }
    }
}

impl<R: Read> Read for InterruptOnce<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut limit = buf.len();
        if !self.fired {
            if self.pos >= self.at {
                self.fired = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            limit = limit.min(usize::try_from(self.at - self.pos).unwrap_or(usize::MAX));
        }
        let n = self.inner.read(&mut buf[..limit])?;
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_builder_preserves_raw_names() {
        let bytes = TarTestBuilder::new()
            .add_file("../escape.txt", b"x")
            .add_file("/abs.txt", b"y")
            .build();
        let mut archive = tar::Archive::new(Cursor::new(bytes));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| String::from_utf8(e.unwrap().path_bytes().into_owned()).unwrap())
            .collect();
        assert_eq!(names, vec!["../escape.txt", "/abs.txt"]);
    }

    #[test]
    fn test_build_compressed_is_detected() {
        let bytes = TarTestBuilder::new()
            .add_file("a", b"a")
            .build_compressed(CompressionType::Gzip);
        assert_eq!(codec::detect(&bytes), Some(CompressionType::Gzip));
    }
}
