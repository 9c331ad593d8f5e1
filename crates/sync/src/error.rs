//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Each phase of a run has its own
//! error module; this is the top of the tree that callers of [`run`](crate::run)
//! see.

use crate::preflight::error::{Error as PreflightError, ErrorKind as PreflightErrorKind};
use crate::publish::error::{Error as PublishError, ErrorKind as PublishErrorKind};
use crate::refresh::error::{Error as RefreshError, ErrorKind as RefreshErrorKind};
use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the phase of a run that failed.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configuration or environment precondition does not hold. Nothing
    /// has been modified.
    #[display("preflight check failed: {_0}")]
    Preflight(PreflightErrorKind),
    /// The package manager configuration could not be read.
    #[display("unable to read pacman configuration")]
    PacmanConf,
    /// The lock marker could not be created for a reason other than
    /// contention.
    #[display("unable to acquire lock")]
    Lock,
    /// The package cache could not be listed.
    #[display("publishing the package cache failed")]
    Publish,
    /// A database could not be refreshed; the run stopped at that repository.
    #[display("refreshing package databases failed")]
    Refresh,
    /// A termination signal arrived; the run stopped at the next safe point.
    #[display("interrupted by signal")]
    Interrupted,
}

impl ErrorKind {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Preflight(kind) => kind.exit_code(),
            Self::Interrupted => 130,
            Self::PacmanConf | Self::Lock | Self::Publish | Self::Refresh => 1,
        }
    }

    /// Convert a preflight error into a sync error, preserving the preflight
    /// frame as a child in the error tree.
    #[track_caller]
    pub(crate) fn preflight(err: PreflightError) -> Error {
        let inner = (*err).clone();
        err.raise(Self::Preflight(inner))
    }

    #[track_caller]
    pub(crate) fn publish(err: PublishError) -> Error {
        let kind = match *err {
            PublishErrorKind::Interrupted => Self::Interrupted,
            PublishErrorKind::List => Self::Publish,
        };
        err.raise(kind)
    }

    #[track_caller]
    pub(crate) fn refresh(err: RefreshError) -> Error {
        let kind = match *err {
            RefreshErrorKind::Interrupted => Self::Interrupted,
            _ => Self::Refresh,
        };
        err.raise(kind)
    }
}
