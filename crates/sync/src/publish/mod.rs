//! Publishing the local package cache to the content store.
//!
//! Every regular file directly inside the cache directory is added to the
//! store as the service account, then (optionally) deleted locally. This is
//! best-effort: a file that fails to publish or delete is logged, counted and
//! left where it is for the next run.

pub mod error;

use self::error::{ErrorKind, Result};
use exn::ResultExt;
use pacfs_host::HostEnvironment;
use pacfs_storage::LocalDirectory;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// File name suffixes that are never published: in-progress downloads and
/// detached signatures.
pub const SKIPPED_SUFFIXES: [&str; 2] = [".part", ".sig"];

/// What happened to the files in the cache directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Files added to the store.
    pub published: usize,
    /// Published files deleted from the cache afterwards.
    pub removed: usize,
    /// Files that could not be published or deleted.
    pub failed: usize,
    /// Files not considered because of their name.
    pub skipped: usize,
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Publish every eligible file in `cache`, in file name order.
///
/// `shutdown` is checked before each file; once set, publishing stops with
/// [`ErrorKind::Interrupted`].
#[instrument(skip(cache, host, shutdown), fields(cache = %cache.root().display()))]
pub fn publish_cache(
    cache: &LocalDirectory,
    host: &dyn HostEnvironment,
    wipe: bool,
    shutdown: &AtomicBool,
) -> Result<PublishReport> {
    let files = cache.files().or_raise(|| ErrorKind::List)?;
    let mut report = PublishReport::default();

    for file in files {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(?report, "Shutdown requested, publishing stopped");
            exn::bail!(ErrorKind::Interrupted);
        }
        // Non-UTF-8 names can't end with either suffix, so they're published.
        if file.name().is_some_and(is_skipped) {
            tracing::trace!(path = %file.path.display(), "Skipping file");
            report.skipped += 1;
            continue;
        }

        let cid = match host.publish(&file.path) {
            Ok(cid) => cid,
            Err(err) => {
                tracing::warn!(path = %file.path.display(), "Unable to publish file: {err:?}");
                report.failed += 1;
                continue;
            },
        };
        tracing::debug!(path = %file.path.display(), %cid, size = file.size, "Published file");
        report.published += 1;

        if wipe {
            match cache.delete(file.path.file_name().unwrap_or_default()) {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), "Unable to remove published file: {err:?}");
                    report.failed += 1;
                },
            }
        }
    }

    Ok(report)
}
