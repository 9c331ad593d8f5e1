//! Checks that must pass before anything is locked or modified.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. no required configuration value is empty;
//! 2. the process is privileged;
//! 3. the cache directory, database directory and `pacman.conf` exist;
//! 4. the service account exists;
//! 5. the store daemon is running;
//! 6. the store is mounted;
//! 7. the remote database directory is readable (only when databases are
//!    going to be refreshed).
//!
//! A host query that itself fails is reported as the precondition it was
//! trying to establish, with the query error as the child frame.

pub mod error;

use self::error::{ErrorKind, Result};
use exn::ResultExt;
use pacfs_config::Config;
use pacfs_host::HostEnvironment;
use pacfs_storage::LocalDirectory;

pub fn check(config: &Config, host: &dyn HostEnvironment, sync_databases: bool) -> Result<()> {
    if let Some(field) = config.first_empty() {
        exn::bail!(ErrorKind::EmptyValue(field));
    }

    if !host.is_privileged().or_raise(|| ErrorKind::Unprivileged)? {
        exn::bail!(ErrorKind::Unprivileged);
    }

    if !config.cache_dir.is_dir() {
        exn::bail!(ErrorKind::MissingCacheDir(config.cache_dir.clone()));
    }
    if !config.db_dir.is_dir() {
        exn::bail!(ErrorKind::MissingDbDir(config.db_dir.clone()));
    }
    if !config.pacman_conf.is_file() {
        exn::bail!(ErrorKind::MissingPacmanConf(config.pacman_conf.clone()));
    }

    let user = &config.service_user;
    if !host.user_exists(user).or_raise(|| ErrorKind::MissingServiceUser(user.clone()))? {
        exn::bail!(ErrorKind::MissingServiceUser(user.clone()));
    }

    let daemon = &config.daemon_process;
    if !host.is_process_running(daemon).or_raise(|| ErrorKind::DaemonNotRunning(daemon.clone()))? {
        exn::bail!(ErrorKind::DaemonNotRunning(daemon.clone()));
    }

    let mount = &config.mount_root;
    if !host.is_mounted(mount).or_raise(|| ErrorKind::NotMounted(mount.clone()))? {
        exn::bail!(ErrorKind::NotMounted(mount.clone()));
    }

    if sync_databases {
        let remote = config.remote_db_dir();
        LocalDirectory::open(&remote).or_raise(|| ErrorKind::RemoteUnavailable(remote.clone()))?;
    }

    tracing::debug!(sync_databases, "Preflight checks passed");
    Ok(())
}
