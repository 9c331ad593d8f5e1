//! Refreshing local sync databases from the store mount.
//!
//! For each tracked repository `R`, the local `<db_dir>/R.db` is compared by
//! size with `<remote_db_dir>/R.db`. When they differ, the remote file
//! replaces the local one using [`swap::replace`], so the active path always
//! holds a complete database and the previous one is kept as `R.db.old`.
//!
//! | local   | remote  | result                                   |
//! |---------|---------|------------------------------------------|
//! | missing | any     | fatal, stop before later repositories    |
//! | present | missing | warn, [`Outcome::RemoteMissing`]         |
//! | size A  | size A  | nothing written, [`Outcome::UpToDate`]   |
//! | size A  | size B  | replaced, [`Outcome::Replaced`]          |

pub mod error;

use self::error::{ErrorKind, Result};
use exn::ResultExt;
use pacfs_storage::error::ErrorKind as StorageErrorKind;
use pacfs_storage::{LocalDirectory, swap};
use std::sync::atomic::{AtomicBool, Ordering};

/// File name extension of a sync database.
pub const DATABASE_EXTENSION: &str = "db";

/// What happened to one repository's database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Local and remote databases have the same size.
    UpToDate,
    /// The store has no database for this repository.
    RemoteMissing,
    /// The local database was replaced; sizes are in bytes.
    Replaced { previous: u64, current: u64 },
}

fn database_name(repository: &str) -> String {
    format!("{repository}.{DATABASE_EXTENSION}")
}

/// Refresh one repository's database.
pub fn refresh_repository(local: &LocalDirectory, remote: &LocalDirectory, repository: &str) -> Result<Outcome> {
    let name = database_name(repository);
    let invalid = || ErrorKind::InvalidName(repository.to_string());
    let active = local.path(&name).or_raise(invalid)?;
    let candidate = remote.path(&name).or_raise(invalid)?;

    let previous = match local.stat(&name) {
        Ok(info) => info.size,
        Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {
            exn::bail!(ErrorKind::MissingLocalDatabase(repository.to_string()))
        },
        Err(err) => return Err(err.raise(ErrorKind::Stat(repository.to_string()))),
    };
    let current = match remote.stat(&name) {
        Ok(info) => info.size,
        Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => {
            tracing::warn!(repository, path = %candidate.display(), "Remote database does not exist, skipping");
            return Ok(Outcome::RemoteMissing);
        },
        Err(err) => return Err(err.raise(ErrorKind::Stat(repository.to_string()))),
    };

    if previous == current {
        tracing::debug!(repository, size = current, "Database is up to date");
        return Ok(Outcome::UpToDate);
    }

    tracing::info!(repository, previous, current, "Replacing database");
    swap::replace(&active, &candidate, current).map_err(|err| {
        let step = *err;
        if !step.active_intact() {
            tracing::error!(
                repository,
                active = %active.display(),
                "Database replacement interrupted after rotation; the previous database is in the .old file"
            );
        }
        err.raise(ErrorKind::Swap { repository: repository.to_string(), step })
    })?;
    Ok(Outcome::Replaced { previous, current })
}

/// Refresh each repository in order, stopping at the first fatal error.
///
/// `shutdown` is checked between repositories, never during a replacement.
pub fn refresh_databases(
    local: &LocalDirectory,
    remote: &LocalDirectory,
    repositories: &[&str],
    shutdown: &AtomicBool,
) -> Result<Vec<(String, Outcome)>> {
    let mut outcomes = Vec::with_capacity(repositories.len());
    for repository in repositories {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(done = outcomes.len(), "Shutdown requested, refresh stopped");
            exn::bail!(ErrorKind::Interrupted);
        }
        let outcome = refresh_repository(local, remote, repository)?;
        outcomes.push((repository.to_string(), outcome));
    }
    Ok(outcomes)
}
