//! One synchronisation run between pacman and the content store.
//!
//! [`run`] performs, in order:
//!
//! 1. [`preflight`] checks; nothing is touched if any fails.
//! 2. Acquisition of the lock marker shared with pacman. If another process
//!    holds it, the run ends successfully without doing anything.
//! 3. [`publish`]ing the package cache to the store.
//! 4. [`refresh`]ing the tracked sync databases from the store mount (unless
//!    disabled).
//!
//! The lock marker is removed when the run ends, however it ends.

pub mod error;
pub mod pacman;
pub mod preflight;
pub mod publish;
pub mod refresh;

use crate::error::{ErrorKind, Result};
use crate::pacman::PacmanConf;
use crate::publish::PublishReport;
use crate::refresh::Outcome;
use exn::ResultExt;
use pacfs_config::Config;
use pacfs_host::HostEnvironment;
use pacfs_storage::error::ErrorKind as StorageErrorKind;
use pacfs_storage::{LocalDirectory, LockFile};
use std::sync::atomic::AtomicBool;

/// Switches taken from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Refresh the tracked sync databases after publishing.
    pub sync_databases: bool,
    /// Delete cache files once they are published.
    pub wipe_cache: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { sync_databases: true, wipe_cache: true }
    }
}

/// How a run ended, when it didn't fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Another process holds the lock; nothing was done.
    Contended,
    Completed {
        published: PublishReport,
        /// `None` when database refresh was disabled.
        refreshed: Option<Vec<(String, Outcome)>>,
    },
}

/// Perform one run. See the [crate documentation](crate).
///
/// `shutdown` is polled between cache files and between repositories; once
/// set, the run stops with [`ErrorKind::Interrupted`].
pub fn run(config: &Config, host: &dyn HostEnvironment, options: Options, shutdown: &AtomicBool) -> Result<Summary> {
    preflight::check(config, host, options.sync_databases).map_err(ErrorKind::preflight)?;

    let pacman = if options.sync_databases {
        Some(PacmanConf::load(&config.pacman_conf)?)
    } else {
        None
    };
    let cache = LocalDirectory::open(&config.cache_dir).or_raise(|| ErrorKind::Publish)?;

    let _lock = match LockFile::acquire(&config.lock_file) {
        Ok(lock) => lock,
        Err(err) if matches!(&*err, StorageErrorKind::AlreadyExists(_)) => {
            tracing::info!(lock = %config.lock_file.display(), "Lock is held by another process, nothing to do");
            return Ok(Summary::Contended);
        },
        Err(err) => return Err(err.raise(ErrorKind::Lock)),
    };

    let published = publish::publish_cache(&cache, host, options.wipe_cache, shutdown).map_err(ErrorKind::publish)?;
    tracing::info!(
        published = published.published,
        removed = published.removed,
        failed = published.failed,
        skipped = published.skipped,
        "Package cache published"
    );

    let refreshed = match pacman {
        Some(conf) => {
            let repositories = conf.tracked();
            let local = LocalDirectory::open(&config.db_dir).or_raise(|| ErrorKind::Refresh)?;
            let remote = LocalDirectory::open(config.remote_db_dir()).or_raise(|| ErrorKind::Refresh)?;
            let outcomes =
                refresh::refresh_databases(&local, &remote, &repositories, shutdown).map_err(ErrorKind::refresh)?;
            let replaced = outcomes.iter().filter(|(_, o)| matches!(o, Outcome::Replaced { .. })).count();
            tracing::info!(tracked = outcomes.len(), replaced, "Sync databases refreshed");
            Some(outcomes)
        },
        None => {
            tracing::debug!("Database refresh disabled");
            None
        },
    };

    Ok(Summary::Completed { published, refreshed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacfs_host::MockHost;
    use std::ffi::CString;
    use std::fs::{self, OpenOptions};
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::OpenOptionsExt;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    struct Environment {
        _temp_dir: tempfile::TempDir,
        config: Config,
        host: MockHost,
    }

    impl Environment {
        fn new() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let root = temp_dir.path();
            let config = Config {
                cache_dir: root.join("cache"),
                db_dir: root.join("sync"),
                pacman_conf: root.join("pacman.conf"),
                lock_file: root.join("db.lck"),
                mount_root: root.join("ipns"),
                ..Config::default()
            };
            fs::create_dir_all(&config.cache_dir).unwrap();
            fs::create_dir_all(&config.db_dir).unwrap();
            fs::create_dir_all(config.remote_db_dir()).unwrap();
            fs::write(
                &config.pacman_conf,
                "[options]\n#PacfsSync = core extra community\n[core]\n[extra]\n[community]\n",
            )
            .unwrap();

            fs::write(config.cache_dir.join("acl-2.3.2-1-x86_64.pkg.tar.zst"), b"acl").unwrap();
            fs::write(config.cache_dir.join("acl-2.3.2-1-x86_64.pkg.tar.zst.sig"), b"sig").unwrap();
            fs::write(config.cache_dir.join("bash-5.2.037-1-x86_64.pkg.tar.zst"), b"bash").unwrap();
            fs::write(config.cache_dir.join("glibc-2.40-1-x86_64.pkg.tar.zst.part"), b"gli").unwrap();

            fs::write(config.db_dir.join("core.db"), b"core").unwrap();
            fs::write(config.remote_db_dir().join("core.db"), b"core").unwrap();
            fs::write(config.db_dir.join("extra.db"), vec![1u8; 1_048_576]).unwrap();
            fs::write(config.remote_db_dir().join("extra.db"), vec![2u8; 1_048_600]).unwrap();
            fs::write(config.db_dir.join("community.db"), b"community").unwrap();

            let host = MockHost::default()
                .with_user(&config.service_user)
                .with_process(&config.daemon_process)
                .with_mount(&config.mount_root);
            Self { _temp_dir: temp_dir, config, host }
        }

        fn run(&self, options: Options) -> Result<Summary> {
            run(&self.config, &self.host, options, &AtomicBool::new(false))
        }

        fn cache_files(&self) -> usize {
            fs::read_dir(&self.config.cache_dir).unwrap().count()
        }

        fn read(&self, path: &Path) -> Vec<u8> {
            fs::read(path).unwrap()
        }
    }

    #[test]
    fn test_complete_run() {
        let env = Environment::new();

        let summary = env.run(Options::default()).unwrap();

        let Summary::Completed { published, refreshed } = summary else {
            panic!("expected a completed run");
        };
        assert_eq!(published, PublishReport { published: 2, removed: 2, failed: 0, skipped: 2 });
        assert_eq!(
            refreshed.unwrap(),
            [
                ("core".to_string(), Outcome::UpToDate),
                ("extra".to_string(), Outcome::Replaced { previous: 1_048_576, current: 1_048_600 }),
                ("community".to_string(), Outcome::RemoteMissing),
            ]
        );
        assert_eq!(env.cache_files(), 2);
        assert_eq!(env.read(&env.config.db_dir.join("extra.db")), vec![2u8; 1_048_600]);
        assert_eq!(env.read(&env.config.db_dir.join("community.db")), b"community");
        assert!(!env.config.lock_file.exists());
    }

    /// Replace a regular file with a named pipe.
    fn make_fifo(path: &Path) {
        fs::remove_file(path).unwrap();
        let path = CString::new(path.as_os_str().as_bytes()).unwrap();
        // SAFETY: `path` is a valid NUL-terminated string for the whole call.
        assert_eq!(unsafe { libc::mkfifo(path.as_ptr(), 0o644) }, 0);
    }

    #[test]
    fn test_lock_is_held_while_publishing_and_replacing() {
        let mut env = Environment::new();
        env.host = MockHost::default()
            .with_user("ipfs")
            .with_process("ipfs")
            .with_mount(&env.config.mount_root)
            .with_witness(&env.config.lock_file);
        // The remote `extra.db` becomes an empty pipe: its size (zero) differs
        // from the local database, and the writer end only opens once the
        // replacement starts reading it.
        let candidate = env.config.remote_db_dir().join("extra.db");
        make_fifo(&candidate);
        let lock_file = env.config.lock_file.clone();
        let observer = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                // Non-blocking opens of the write end fail until there's a reader.
                match OpenOptions::new().write(true).custom_flags(libc::O_NONBLOCK).open(&candidate) {
                    Ok(_writer) => return Some(lock_file.exists()),
                    Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
                    Err(_) => return None,
                }
            }
        });

        let summary = env.run(Options::default()).unwrap();

        assert_eq!(observer.join().unwrap(), Some(true), "lock marker missing while replacing a database");
        assert_eq!(env.host.witnessed(), [true, true], "lock marker missing while publishing");
        let Summary::Completed { refreshed, .. } = summary else {
            panic!("expected a completed run");
        };
        assert_eq!(
            refreshed.unwrap()[1],
            ("extra".to_string(), Outcome::Replaced { previous: 1_048_576, current: 0 })
        );
        assert_eq!(env.read(&env.config.db_dir.join("extra.db.old")).len(), 1_048_576);
        assert!(!env.config.lock_file.exists());
    }

    #[test]
    fn test_options_disable_refresh_and_wipe() {
        let env = Environment::new();

        let summary = env.run(Options { sync_databases: false, wipe_cache: false }).unwrap();

        assert_eq!(
            summary,
            Summary::Completed {
                published: PublishReport { published: 2, removed: 0, failed: 0, skipped: 2 },
                refreshed: None,
            }
        );
        assert_eq!(env.cache_files(), 4);
        assert_eq!(env.read(&env.config.db_dir.join("extra.db")).len(), 1_048_576);
        assert!(!env.config.lock_file.exists());
    }

    #[test]
    fn test_contended_lock_changes_nothing() {
        let env = Environment::new();
        fs::write(&env.config.lock_file, b"4242\n").unwrap();

        let summary = env.run(Options::default()).unwrap();

        assert_eq!(summary, Summary::Contended);
        assert!(env.host.published().is_empty());
        assert_eq!(env.cache_files(), 4);
        assert_eq!(env.read(&env.config.db_dir.join("extra.db")).len(), 1_048_576);
        assert!(!env.config.db_dir.join("extra.db.old").exists());
        assert_eq!(env.read(&env.config.lock_file), b"4242\n");
    }

    #[test]
    fn test_missing_local_database_aborts_and_releases_lock() {
        let env = Environment::new();
        fs::remove_file(env.config.db_dir.join("core.db")).unwrap();

        let err = env.run(Options::default()).unwrap_err();

        assert!(matches!(&*err, ErrorKind::Refresh));
        assert_eq!(err.exit_code(), 1);
        // `core` comes first, so `extra` was never replaced.
        assert_eq!(env.read(&env.config.db_dir.join("extra.db")).len(), 1_048_576);
        assert!(!env.config.lock_file.exists());
    }

    #[test]
    fn test_failed_publish_does_not_fail_run() {
        let mut env = Environment::new();
        env.host = MockHost::default()
            .with_user("ipfs")
            .with_process("ipfs")
            .with_mount(&env.config.mount_root)
            .with_failing_publish("acl-2.3.2-1-x86_64.pkg.tar.zst");

        let summary = env.run(Options::default()).unwrap();

        let Summary::Completed { published, .. } = summary else {
            panic!("expected a completed run");
        };
        assert_eq!(published, PublishReport { published: 1, removed: 1, failed: 1, skipped: 2 });
        assert!(env.config.cache_dir.join("acl-2.3.2-1-x86_64.pkg.tar.zst").exists());
    }

    #[test]
    fn test_preflight_failure_changes_nothing() {
        let mut env = Environment::new();
        env.host = MockHost::default().with_user("ipfs").with_mount(&env.config.mount_root);

        let err = env.run(Options::default()).unwrap_err();

        assert!(matches!(&*err, ErrorKind::Preflight(_)));
        assert_eq!(err.exit_code(), 151);
        assert!(env.host.published().is_empty());
        assert_eq!(env.cache_files(), 4);
        assert!(!env.config.lock_file.exists());
    }

    #[test]
    fn test_empty_configuration_value() {
        let mut env = Environment::new();
        env.config.repository_set = String::new();

        let err = env.run(Options::default()).unwrap_err();

        assert_eq!(err.exit_code(), 17);
    }

    #[test]
    fn test_shutdown_interrupts_run_and_releases_lock() {
        let env = Environment::new();

        let err = run(&env.config, &env.host, Options::default(), &AtomicBool::new(true)).unwrap_err();

        assert!(matches!(&*err, ErrorKind::Interrupted));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(env.cache_files(), 4);
        assert!(!env.config.lock_file.exists());
    }

    #[test]
    fn test_missing_pacman_conf_directive_refreshes_nothing() {
        let env = Environment::new();
        fs::write(&env.config.pacman_conf, "[options]\n[core]\n[extra]\n").unwrap();

        let summary = env.run(Options::default()).unwrap();

        let Summary::Completed { refreshed, .. } = summary else {
            panic!("expected a completed run");
        };
        assert_eq!(refreshed, Some(vec![]));
        assert_eq!(env.read(&env.config.db_dir.join("extra.db")).len(), 1_048_576);
    }
}
