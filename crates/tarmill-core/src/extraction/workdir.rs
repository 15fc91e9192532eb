//! Scoped change of the process working directory.
//!
//! Extraction writes entries relative to the destination by making it the
//! working directory for the duration of the call. The working directory is
//! process state, so every guard holds a process-wide lock until it has put
//! the original directory back.

use crate::ArchiveError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

static WORKDIR_LOCK: Mutex<()> = Mutex::new(());

/// Holds the destination as working directory and restores the original on
/// [`restore`](Self::restore) or drop.
#[derive(Debug)]
pub struct WorkingDirGuard {
    original: PathBuf,
    restored: bool,
    _lock: MutexGuard<'static, ()>,
}

impl WorkingDirGuard {
    /// Captures the current directory, creates `dest` if missing and changes
    /// into it.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::WorkingDirectory`] if the current directory
    /// cannot be read, or `dest` cannot be created or entered. The working
    /// directory is unchanged in that case.
    pub fn enter(dest: &Path) -> Result<Self> {
        let lock = WORKDIR_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let original = std::env::current_dir().map_err(|source| ArchiveError::WorkingDirectory {
            path: PathBuf::from("."),
            source,
        })?;
        let wd_error = |source| ArchiveError::WorkingDirectory {
            path: dest.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(dest).map_err(wd_error)?;
        std::env::set_current_dir(dest).map_err(wd_error)?;

        log::debug!(
            "working directory {} -> {}",
            original.display(),
            dest.display()
        );
        Ok(Self {
            original,
            restored: false,
            _lock: lock,
        })
    }

    /// Directory that was current before [`enter`](Self::enter).
    #[must_use]
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Changes back to the original directory and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::WorkingDirectory`] if the original directory
    /// can no longer be entered.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.change_back()
    }

    fn change_back(&self) -> Result<()> {
        std::env::set_current_dir(&self.original).map_err(|source| {
            ArchiveError::WorkingDirectory {
                path: self.original.clone(),
                source,
            }
        })?;
        log::debug!("working directory restored to {}", self.original.display());
        Ok(())
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.change_back() {
            log::error!("failed to restore working directory: {e}");
        }
    }
}
