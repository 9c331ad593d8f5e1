use crate::error::{ErrorKind, Result};
use crate::{ContentId, HostEnvironment, mounts, process};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::instrument;

const PROC_ROOT: &str = "/proc";

/// The machine pacfs is actually running on.
///
/// Identity comes from `geteuid(2)`, account lookups from `id(1)`, the
/// process and mount tables from procfs. Publishing runs the content store
/// client through `sudo` as the service account.
#[derive(Debug, Clone)]
pub struct SystemHost {
    service_user: String,
    store_binary: String,
    proc_root: PathBuf,
}
impl SystemHost {
    /// `store_binary` is the content store's client executable name (looked
    /// up on `PATH` when publishing); `service_user` is who it runs as.
    pub fn new(service_user: impl Into<String>, store_binary: impl Into<String>) -> Self {
        Self {
            service_user: service_user.into(),
            store_binary: store_binary.into(),
            proc_root: PathBuf::from(PROC_ROOT),
        }
    }

    fn executable(name: &str) -> Result<PathBuf> {
        which::which(name).or_raise(|| ErrorKind::ExecutableNotFound(name.to_string()))
    }

    fn output(command: &mut Command) -> Result<Output> {
        command.stdin(Stdio::null()).output().or_raise(|| ErrorKind::Io)
    }
}

impl HostEnvironment for SystemHost {
    fn is_privileged(&self) -> Result<bool> {
        // SAFETY: geteuid(2) has no preconditions and cannot fail.
        Ok(unsafe { libc::geteuid() } == 0)
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        let id = Self::executable("id")?;
        let output = Self::output(Command::new(id).arg("-u").arg(name))?;
        Ok(output.status.success())
    }

    fn is_process_running(&self, name: &str) -> Result<bool> {
        process::is_running(&self.proc_root, name)
    }

    fn is_mounted(&self, path: &Path) -> Result<bool> {
        let table = std::fs::read_to_string(self.proc_root.join("self/mounts")).or_raise(|| ErrorKind::Io)?;
        Ok(mounts::mount_points(&table).any(|point| point == path))
    }

    #[instrument(skip(self), fields(user = %self.service_user))]
    fn publish(&self, file: &Path) -> Result<ContentId> {
        let sudo = Self::executable("sudo")?;
        let store = Self::executable(&self.store_binary)?;
        let output = Self::output(
            Command::new(sudo)
                .args(["-n", "-u", self.service_user.as_str(), "--"])
                .arg(store)
                .args(["add", "--quieter", "--raw-leaves", "--pin=false"])
                .arg(file),
        )?;
        if !output.status.success() {
            exn::bail!(ErrorKind::CommandFailed {
                command: format!("{} add", self.store_binary),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let cid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if cid.is_empty() || cid.contains(char::is_whitespace) {
            exn::bail!(ErrorKind::InvalidOutput(format!("{} add", self.store_binary)));
        }
        Ok(cid)
    }
}
