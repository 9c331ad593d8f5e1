//! Configuration errors.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Merging or deserializing the configuration sources failed.
    #[display("unable to load configuration")]
    Load,
}

impl ErrorKind {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) | Self::Load => 1,
        }
    }
}
