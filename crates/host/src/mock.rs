//! Scriptable host environment for testing.

use crate::error::{ErrorKind, Result};
use crate::{ContentId, HostEnvironment};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory [`HostEnvironment`] for testing.
///
/// Starts out privileged with no users, processes, or mounts. Every file
/// passed to [`publish`](HostEnvironment::publish) is recorded, and
/// publishing succeeds unless the file name was registered with
/// [`with_failing_publish`](Self::with_failing_publish).
///
/// # Examples
///
/// ```
/// use pacfs_host::{HostEnvironment, MockHost};
/// use std::path::Path;
///
/// let host = MockHost::default().with_user("ipfs").with_process("ipfs").with_mount("/ipns");
/// assert!(host.user_exists("ipfs").unwrap());
/// assert!(host.is_mounted(Path::new("/ipns")).unwrap());
/// host.publish(Path::new("/var/cache/pacman/pkg/zstd-1.5.6-1-x86_64.pkg.tar.zst")).unwrap();
/// assert_eq!(host.published().len(), 1);
/// ```
#[derive(Debug)]
pub struct MockHost {
    privileged: bool,
    users: HashSet<String>,
    processes: HashSet<String>,
    mounts: HashSet<PathBuf>,
    failing: HashSet<String>,
    witness: Option<PathBuf>,
    published: Mutex<Vec<PathBuf>>,
    witnessed: Mutex<Vec<bool>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            privileged: true,
            users: HashSet::new(),
            processes: HashSet::new(),
            mounts: HashSet::new(),
            failing: HashSet::new(),
            witness: None,
            published: Mutex::new(Vec::new()),
            witnessed: Mutex::new(Vec::new()),
        }
    }
}

impl MockHost {
    pub fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    pub fn with_user(mut self, name: impl Into<String>) -> Self {
        self.users.insert(name.into());
        self
    }

    pub fn with_process(mut self, name: impl Into<String>) -> Self {
        self.processes.insert(name.into());
        self
    }

    pub fn with_mount(mut self, path: impl Into<PathBuf>) -> Self {
        self.mounts.insert(path.into());
        self
    }

    /// Make publishing any file with this file name fail.
    pub fn with_failing_publish(mut self, file_name: impl Into<String>) -> Self {
        self.failing.insert(file_name.into());
        self
    }

    /// On every `publish` call, record whether `path` exists at that moment.
    pub fn with_witness(mut self, path: impl Into<PathBuf>) -> Self {
        self.witness = Some(path.into());
        self
    }

    /// Whether the [witness](Self::with_witness) path existed, one entry per
    /// `publish` call.
    pub fn witnessed(&self) -> Vec<bool> {
        self.witnessed.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Every path passed to `publish`, in call order (including failures).
    pub fn published(&self) -> Vec<PathBuf> {
        // A poisoned lock only happens if a test already panicked.
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl HostEnvironment for MockHost {
    fn is_privileged(&self) -> Result<bool> {
        Ok(self.privileged)
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.users.contains(name))
    }

    fn is_process_running(&self, name: &str) -> Result<bool> {
        Ok(self.processes.contains(name))
    }

    fn is_mounted(&self, path: &Path) -> Result<bool> {
        Ok(self.mounts.iter().any(|m| m == path))
    }

    fn publish(&self, file: &Path) -> Result<ContentId> {
        if let Ok(mut published) = self.published.lock() {
            published.push(file.to_path_buf());
        }
        if let Some(witness) = &self.witness
            && let Ok(mut witnessed) = self.witnessed.lock()
        {
            witnessed.push(witness.exists());
        }
        let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.failing.contains(&name) {
            exn::bail!(ErrorKind::CommandFailed {
                command: "mock add".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("refusing to publish {name}"),
            });
        }
        Ok(format!("bafkmock{}", name.len()))
    }
}
