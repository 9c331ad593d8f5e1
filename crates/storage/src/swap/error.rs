//! Error types for the [`swap`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! The kind is the step that failed; the underlying I/O error (if any) is
//! the child frame.

use derive_more::{Display, Error};

/// A swap error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<SwapStep>;
/// Result type alias for swap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The step of the replacement protocol that failed.
///
/// Steps are listed in the order they are performed. Any step up to and
/// including [`SyncStaged`](Self::SyncStaged) leaves the active file
/// untouched; [`Rotate`](Self::Rotate) onwards means the active path may be
/// missing and the previous content is in the `.old` file.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapStep {
    /// Reading the active file's permissions failed.
    #[display("read active file permissions")]
    Inspect,
    /// Copying the candidate into the staging file failed.
    #[display("copy candidate to staging file")]
    Copy,
    /// The staging file does not have the expected length.
    #[display("verify staging file")]
    Verify,
    /// Applying the active file's permissions to the staging file failed.
    #[display("set staging file permissions")]
    Permissions,
    #[display("flush staging file")]
    SyncStaged,
    /// Moving the active file aside failed.
    #[display("rotate active file out")]
    Rotate,
    #[display("flush directory after rotation")]
    SyncRotated,
    /// Moving the staging file into the active path failed.
    #[display("activate staging file")]
    Activate,
    #[display("flush directory after activation")]
    SyncActivated,
}

impl SwapStep {
    /// Returns `true` if the active path is guaranteed to still hold the
    /// previous, complete file after this step failed.
    pub fn active_intact(&self) -> bool {
        matches!(self, Self::Inspect | Self::Copy | Self::Verify | Self::Permissions | Self::SyncStaged)
    }
}
