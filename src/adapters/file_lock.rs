//! Single-instance guard for the live runner.
//!
//! Holds an exclusive OS advisory lock on the lock file for as long as the
//! guard lives. The kernel drops the lock when the handle closes, so a
//! crashed run never blocks the next one. The file's content is the owner's
//! PID and is informational only.

use crate::domain::error::TurtleError;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: File,
}

impl FileLock {
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, TurtleError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| TurtleError::Lock {
                reason: format!("cannot open {}: {e}", path.display()),
            })?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                let owner = fs::read_to_string(&path).unwrap_or_default();
                return Err(TurtleError::Lock {
                    reason: format!("{} is held by pid {}", path.display(), owner.trim()),
                });
            }
            Err(TryLockError::Error(e)) => {
                return Err(TurtleError::Lock {
                    reason: format!("cannot lock {}: {e}", path.display()),
                });
            }
        }

        // Stale content from an earlier owner is overwritten.
        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;
        Ok(FileLock { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // The file stays on disk; unlinking it would let a waiter lock an
        // orphaned inode while a third process creates a fresh one.
        if let Err(e) = self.file.set_len(0) {
            warn!(path = %self.path.display(), error = %e, "could not clear lock owner");
        }
    }
}
