//! Crash-safe replacement of a file with a candidate from elsewhere.
//!
//! Given an *active* file (`core.db`) and a *candidate* (the same database
//! on the store mount), the replacement runs in three phases, each one a
//! state of [`Swap`]:
//!
//! 1. **[`Staged`]**: the candidate is copied byte-for-byte to
//!    `core.db.part`, checked for length, given the active file's permission
//!    bits and flushed to disk.
//! 2. **[`Rotated`]**: `core.db` is renamed to `core.db.old` and the
//!    directory is flushed.
//! 3. **[`Active`]**: `core.db.part` is renamed to `core.db` and the
//!    directory is flushed.
//!
//! Before phase 2 the active path still holds the previous content. Between
//! phases 2 and 3 the active path is briefly missing, but the replacement is
//! already complete and durable so only a single rename stands between it and
//! the active path. The `.old` file is left behind as a recovery artifact.
//!
//! ```no_run
//! use pacfs_storage::swap::Swap;
//!
//! # fn example() -> pacfs_storage::swap::error::Result<()> {
//! let active = Swap::new("/var/lib/pacman/sync/core.db", "/ipns/pkg.pacman.store/arch/x86_64/default/db/core.db")
//!     .stage(163_840)?
//!     .rotate()?
//!     .activate()?;
//! assert_eq!(active.bytes(), 163_840);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use self::error::SwapStep;
use self::error::Result;
use crate::local::{parent_dir, sync_dir};
use exn::ResultExt;
use std::ffi::OsString;
use std::fs::{self, File, Permissions};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Suffix of the file the candidate is copied into before activation.
pub const STAGED_SUFFIX: &str = ".part";
/// Suffix the previous active file is renamed to.
pub const ROTATED_SUFFIX: &str = ".old";

mod sealed {
    pub trait Sealed {}
}
pub trait SwapState: sealed::Sealed {}

/// Nothing has been touched yet.
#[derive(Debug)]
pub struct Pending;
impl sealed::Sealed for Pending {}
impl SwapState for Pending {}

/// The staging file is complete, has the right permissions and is durable.
#[derive(Debug)]
pub struct Staged;
impl sealed::Sealed for Staged {}
impl SwapState for Staged {}

/// The previous active file has been moved to the `.old` path.
#[derive(Debug)]
pub struct Rotated;
impl sealed::Sealed for Rotated {}
impl SwapState for Rotated {}

/// The staging file is now the active file.
#[derive(Debug)]
pub struct Active;
impl sealed::Sealed for Active {}
impl SwapState for Active {}

/// A file replacement in progress. See the [module docs](self).
#[derive(Debug)]
pub struct Swap<S: SwapState = Pending> {
    active: PathBuf,
    candidate: PathBuf,
    staged: PathBuf,
    rotated: PathBuf,
    bytes: u64,
    _state: PhantomData<S>,
}

impl<S: SwapState> Swap<S> {
    fn transition<T: SwapState>(self) -> Swap<T> {
        Swap {
            active: self.active,
            candidate: self.candidate,
            staged: self.staged,
            rotated: self.rotated,
            bytes: self.bytes,
            _state: PhantomData,
        }
    }
}

impl Swap<Pending> {
    pub fn new(active: impl Into<PathBuf>, candidate: impl Into<PathBuf>) -> Self {
        let active = active.into();
        Self {
            staged: with_suffix(&active, STAGED_SUFFIX),
            rotated: with_suffix(&active, ROTATED_SUFFIX),
            active,
            candidate: candidate.into(),
            bytes: 0,
            _state: PhantomData,
        }
    }

    /// Copy the candidate into the staging file.
    ///
    /// `expected_len` is the candidate size the caller based its decision on.
    /// If the copy produces anything else the candidate changed underneath
    /// us and [`SwapStep::Verify`] is raised. Any existing staging file (left
    /// over from an earlier failure) is overwritten; if staging fails once
    /// the staging file has been created, it is removed again.
    pub fn stage(mut self, expected_len: u64) -> Result<Swap<Staged>> {
        let permissions = fs::metadata(&self.active).or_raise(|| SwapStep::Inspect)?.permissions();

        let mut source = File::open(&self.candidate).or_raise(|| SwapStep::Copy)?;
        let mut staged = File::create(&self.staged).or_raise(|| SwapStep::Copy)?;
        match self.fill(&mut source, &mut staged, expected_len, permissions) {
            Ok(copied) => self.bytes = copied,
            Err(err) => {
                drop(staged);
                if let Err(e) = fs::remove_file(&self.staged) {
                    tracing::warn!(staged = %self.staged.display(), error = %e, "Unable to remove staging file");
                }
                return Err(err);
            },
        }
        tracing::trace!(staged = %self.staged.display(), bytes = self.bytes, "Staging file written");
        Ok(self.transition())
    }

    fn fill(&self, source: &mut File, staged: &mut File, expected_len: u64, permissions: Permissions) -> Result<u64> {
        let copied = io::copy(source, staged).or_raise(|| SwapStep::Copy)?;
        if copied != expected_len {
            tracing::error!(
                candidate = %self.candidate.display(),
                expected = expected_len,
                copied = copied,
                "Candidate size changed while copying"
            );
            exn::bail!(SwapStep::Verify);
        }
        staged.set_permissions(permissions).or_raise(|| SwapStep::Permissions)?;
        staged.sync_all().or_raise(|| SwapStep::SyncStaged)?;
        Ok(copied)
    }
}

impl Swap<Staged> {
    /// Move the active file aside to the `.old` path.
    pub fn rotate(self) -> Result<Swap<Rotated>> {
        fs::rename(&self.active, &self.rotated).or_raise(|| SwapStep::Rotate)?;
        sync_dir(parent_dir(&self.active)).or_raise(|| SwapStep::SyncRotated)?;
        tracing::trace!(rotated = %self.rotated.display(), "Active file rotated out");
        Ok(self.transition())
    }
}

impl Swap<Rotated> {
    /// Move the staging file into the active path.
    pub fn activate(self) -> Result<Swap<Active>> {
        fs::rename(&self.staged, &self.active).or_raise(|| SwapStep::Activate)?;
        sync_dir(parent_dir(&self.active)).or_raise(|| SwapStep::SyncActivated)?;
        tracing::trace!(active = %self.active.display(), "Staging file activated");
        Ok(self.transition())
    }
}

impl Swap<Active> {
    /// Number of bytes now at the active path.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Run the whole protocol, returning the number of bytes now at `active`.
pub fn replace(active: impl Into<PathBuf>, candidate: impl Into<PathBuf>, expected_len: u64) -> Result<u64> {
    let swap = Swap::new(active, candidate).stage(expected_len)?.rotate()?.activate()?;
    Ok(swap.bytes())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        active: PathBuf,
        candidate: PathBuf,
    }

    fn fixture(previous: &[u8], candidate: &[u8]) -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("local")).unwrap();
        fs::create_dir(temp_dir.path().join("remote")).unwrap();
        let active = temp_dir.path().join("local/extra.db");
        let remote = temp_dir.path().join("remote/extra.db");
        fs::write(&active, previous).unwrap();
        fs::set_permissions(&active, fs::Permissions::from_mode(0o640)).unwrap();
        fs::write(&remote, candidate).unwrap();
        fs::set_permissions(&remote, fs::Permissions::from_mode(0o444)).unwrap();
        Fixture { _temp_dir: temp_dir, active, candidate: remote }
    }

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_paths() {
        let swap = Swap::new("/var/lib/pacman/sync/core.db", "/ipns/db/core.db");
        assert_eq!(swap.staged, Path::new("/var/lib/pacman/sync/core.db.part"));
        assert_eq!(swap.rotated, Path::new("/var/lib/pacman/sync/core.db.old"));
        assert_eq!(swap.candidate, Path::new("/ipns/db/core.db"));
    }

    #[test]
    fn test_each_phase() {
        let f = fixture(b"previous", b"replacement");

        let staged = Swap::new(&f.active, &f.candidate).stage(11).unwrap();
        assert_eq!(fs::read(&staged.staged).unwrap(), b"replacement");
        assert_eq!(mode(&staged.staged), 0o640);
        assert_eq!(fs::read(&f.active).unwrap(), b"previous");

        let rotated = staged.rotate().unwrap();
        assert!(!f.active.exists());
        assert_eq!(fs::read(&rotated.rotated).unwrap(), b"previous");

        let active = rotated.activate().unwrap();
        assert_eq!(active.bytes(), 11);
        assert_eq!(fs::read(&f.active).unwrap(), b"replacement");
        assert_eq!(mode(&f.active), 0o640);
        assert!(!active.staged.exists());
        assert_eq!(fs::read(&active.rotated).unwrap(), b"previous");
    }

    #[test]
    fn test_replace() {
        let f = fixture(b"old", b"newer");
        assert_eq!(replace(&f.active, &f.candidate, 5).unwrap(), 5);
        assert_eq!(fs::read(&f.active).unwrap(), b"newer");
        assert_eq!(fs::read(with_suffix(&f.active, ROTATED_SUFFIX)).unwrap(), b"old");
        // The candidate is only ever read.
        assert_eq!(fs::read(&f.candidate).unwrap(), b"newer");
        assert_eq!(mode(&f.candidate), 0o444);
    }

    #[test]
    fn test_replace_overwrites_previous_rotation_and_leftover_staging() {
        let f = fixture(b"second", b"third!");
        fs::write(with_suffix(&f.active, ROTATED_SUFFIX), b"first").unwrap();
        fs::write(with_suffix(&f.active, STAGED_SUFFIX), b"garbage from a crash").unwrap();
        replace(&f.active, &f.candidate, 6).unwrap();
        assert_eq!(fs::read(&f.active).unwrap(), b"third!");
        assert_eq!(fs::read(with_suffix(&f.active, ROTATED_SUFFIX)).unwrap(), b"second");
    }

    #[test]
    fn test_length_mismatch_leaves_active_untouched() {
        let f = fixture(b"previous", b"replacement");
        let err = Swap::new(&f.active, &f.candidate).stage(4).unwrap_err();
        assert_eq!(*err, SwapStep::Verify);
        assert!(err.active_intact());
        assert_eq!(fs::read(&f.active).unwrap(), b"previous");
        assert!(!with_suffix(&f.active, STAGED_SUFFIX).exists());
        assert!(!with_suffix(&f.active, ROTATED_SUFFIX).exists());
    }

    #[test]
    fn test_missing_candidate_fails_at_copy() {
        let f = fixture(b"previous", b"");
        fs::remove_file(&f.candidate).unwrap();
        let err = replace(&f.active, &f.candidate, 0).unwrap_err();
        assert_eq!(*err, SwapStep::Copy);
        assert_eq!(fs::read(&f.active).unwrap(), b"previous");
    }

    #[test]
    fn test_failed_copy_removes_staging_file() {
        let f = fixture(b"previous", b"");
        // Opening a directory for reading works; reading from it doesn't.
        fs::remove_file(&f.candidate).unwrap();
        fs::create_dir(&f.candidate).unwrap();
        let err = replace(&f.active, &f.candidate, 0).unwrap_err();
        assert_eq!(*err, SwapStep::Copy);
        assert!(err.active_intact());
        assert_eq!(fs::read(&f.active).unwrap(), b"previous");
        assert!(!with_suffix(&f.active, STAGED_SUFFIX).exists());
    }

    #[test]
    fn test_missing_active_fails_before_copy() {
        let f = fixture(b"previous", b"replacement");
        fs::remove_file(&f.active).unwrap();
        let err = replace(&f.active, &f.candidate, 11).unwrap_err();
        assert_eq!(*err, SwapStep::Inspect);
        assert!(!with_suffix(&f.active, STAGED_SUFFIX).exists());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(SwapStep::Rotate.to_string(), "rotate active file out");
        assert!(!SwapStep::Activate.active_intact());
    }
}
