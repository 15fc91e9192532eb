//! Depth-bounded directory traversal with an explicit frame stack.
//!
//! Nesting depth comes from the tree being archived, so the walk never
//! recurses: each open directory is a [`TraversalFrame`] on a `Vec`, pushed
//! on descent and popped on backtrack. Dropping the stack closes every open
//! directory handle, which is what happens on every error return.

use crate::ArchiveError;
use crate::Result;
use crate::probe::MetadataProbe;
use std::fs;
use std::fs::ReadDir;
use std::io;
use std::path::Path;
use std::path::PathBuf;

/// Depth budget meaning "no limit".
pub const UNBOUNDED_DEPTH: usize = usize::MAX;

/// Receiver of the entries produced by a walk.
pub trait TraversalSink {
    /// Called once for every directory entered, root included, before any
    /// of its children. `archive_path` ends in `/` unless it is empty.
    fn add_directory_entry(&mut self, disk_path: &Path, archive_path: &str) -> Result<()>;

    /// Called for every non-directory child (files, symlinks, devices).
    fn add_leaf(&mut self, disk_path: &Path, archive_path: &str) -> Result<()>;
}

/// One open directory in the walk.
#[derive(Debug)]
struct TraversalFrame {
    entries: ReadDir,
    disk_path: PathBuf,
    archive_prefix: String,
    depth_remaining: usize,
}

impl TraversalFrame {
    fn open(disk_path: PathBuf, archive_prefix: String, depth_remaining: usize) -> Result<Self> {
        let entries = fs::read_dir(&disk_path).map_err(|source| {
            if source.kind() == io::ErrorKind::PermissionDenied {
                ArchiveError::PermissionDenied {
                    path: disk_path.clone(),
                    source,
                }
            } else {
                ArchiveError::ReadDirectory {
                    path: disk_path.clone(),
                    source,
                }
            }
        })?;
        Ok(Self {
            entries,
            disk_path,
            archive_prefix,
            depth_remaining,
        })
    }
}

/// Appends `/` unless the path is empty or already ends with one.
fn directory_prefix(archive_path: &str) -> String {
    let mut prefix = archive_path.to_string();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// Walks the tree at `root`, naming entries under `archive_root`.
///
/// Returns `Ok(false)` without touching `sink` if `root` is not a directory
/// under the probe's symlink policy. Subdirectories deeper than `max_depth`
/// levels below the root are skipped silently along with their contents;
/// `max_depth == 0` yields the root directory entry and its immediate
/// non-directory children only.
///
/// # Errors
///
/// Any failure to open or read a directory, any child name that is not
/// valid UTF-8, and any error from `sink` aborts the walk. All directory
/// handles are closed before the error is returned.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tarmill_core::Result;
/// use tarmill_core::creation::walker::{TraversalSink, UNBOUNDED_DEPTH, walk};
/// use tarmill_core::probe::MetadataProbe;
///
/// struct Print;
///
/// impl TraversalSink for Print {
///     fn add_directory_entry(&mut self, _: &Path, name: &str) -> Result<()> {
///         println!("{name}");
///         Ok(())
///     }
///
///     fn add_leaf(&mut self, _: &Path, name: &str) -> Result<()> {
///         println!("{name}");
///         Ok(())
///     }
/// }
///
/// walk(&MetadataProbe::new(false), Path::new("src"), "src", UNBOUNDED_DEPTH, &mut Print)?;
/// # Ok::<(), tarmill_core::ArchiveError>(())
/// ```
pub fn walk<S: TraversalSink + ?Sized>(
    probe: &MetadataProbe,
    root: &Path,
    archive_root: &str,
    max_depth: usize,
    sink: &mut S,
) -> Result<bool> {
    if !probe.is_directory(root) {
        return Ok(false);
    }

    let root_frame = TraversalFrame::open(
        root.to_path_buf(),
        directory_prefix(archive_root),
        max_depth,
    )?;
    sink.add_directory_entry(&root_frame.disk_path, &root_frame.archive_prefix)?;

    let mut stack = vec![root_frame];
    while let Some(frame) = stack.last_mut() {
        let entry = match frame.entries.next() {
            None => {
                log::debug!("leaving {}", frame.disk_path.display());
                stack.pop();
                continue;
            }
            Some(Err(source)) => {
                return Err(ArchiveError::ReadDirectory {
                    path: frame.disk_path.clone(),
                    source,
                });
            }
            Some(Ok(entry)) => entry,
        };

        let disk_path = entry.path();
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| ArchiveError::InvalidPath {
                path: disk_path.clone(),
            })?;
        let archive_path = format!("{}{name}", frame.archive_prefix);

        if !probe.is_directory(&disk_path) {
            log::info!(
                "archiving {} as {archive_path}",
                disk_path.display()
            );
            sink.add_leaf(&disk_path, &archive_path)?;
            continue;
        }

        if frame.depth_remaining == 0 {
            log::debug!("depth limit reached, skipping {}", disk_path.display());
            continue;
        }

        let child = TraversalFrame::open(
            disk_path,
            directory_prefix(&archive_path),
            frame.depth_remaining - 1,
        )?;
        log::debug!(
            "entering {} ({} levels left)",
            child.disk_path.display(),
            child.depth_remaining
        );
        sink.add_directory_entry(&child.disk_path, &child.archive_prefix)?;
        stack.push(child);
    }

    Ok(true)
}
