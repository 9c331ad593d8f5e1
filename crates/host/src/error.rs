//! Errors from querying the host or running the content store client.

use derive_more::{Display, Error};

/// A host environment error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for host environment operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A required executable is not on `PATH`.
    #[display("executable not found on PATH: {_0}")]
    ExecutableNotFound(#[error(not(source))] String),
    /// A command ran but exited unsuccessfully.
    #[display("`{command}` failed ({status}): {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },
    /// A command succeeded but printed something unusable.
    #[display("unexpected output from `{_0}`")]
    InvalidOutput(#[error(not(source))] String),
    /// Reading host state (process table, mount table) or spawning a
    /// command failed.
    #[display("I/O error")]
    Io,
}
