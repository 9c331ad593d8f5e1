//! Exclusive lock marker.
//!
//! The marker's *existence* is the lock: it is created with `O_CREAT|O_EXCL`
//! so exactly one contender can ever succeed, and it is removed when the
//! [`LockFile`] is dropped. There is no waiting and no retrying. This is
//! advisory only; processes that don't look for the marker are not stopped.

use crate::error::{ErrorKind, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// A held lock marker. The marker is deleted when this is dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the LockFile is dropped"]
pub struct LockFile {
    path: PathBuf,
}
impl LockFile {
    /// Atomically create the lock marker at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyExists`] if the marker is already present
    /// (someone else holds the lock). Any other error means the lock could
    /// not be taken for an unrelated reason, such as a missing parent
    /// directory.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| ErrorKind::from_io(e, &path))?;
        // From here on the marker is ours; dropping `lock` on the error path
        // below removes it again.
        let lock = Self { path };
        writeln!(file, "{}", std::process::id()).map_err(|e| ErrorKind::from_io(e, &lock.path))?;
        tracing::debug!(path = %lock.path.display(), "Lock acquired");
        Ok(lock)
    }
}
impl Drop for LockFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Lock released"),
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Unable to remove lock file"),
        }
    }
}
