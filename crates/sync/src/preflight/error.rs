use derive_more::{Display, Error};
use pacfs_config::Field;
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// A configuration or environment precondition that does not hold.
///
/// Each kind has its own process exit status so that service managers and
/// wrapper scripts can tell them apart.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration value `{_0}` is empty")]
    EmptyValue(#[error(not(source))] Field),
    #[display("must be run with root privileges")]
    Unprivileged,
    #[display("package cache directory does not exist: {}", _0.display())]
    MissingCacheDir(#[error(not(source))] PathBuf),
    #[display("package database directory does not exist: {}", _0.display())]
    MissingDbDir(#[error(not(source))] PathBuf),
    #[display("pacman configuration does not exist: {}", _0.display())]
    MissingPacmanConf(#[error(not(source))] PathBuf),
    #[display("service account does not exist: {_0}")]
    MissingServiceUser(#[error(not(source))] String),
    #[display("store daemon is not running: {_0}")]
    DaemonNotRunning(#[error(not(source))] String),
    #[display("store is not mounted: {}", _0.display())]
    NotMounted(#[error(not(source))] PathBuf),
    #[display("remote database directory is not accessible: {}", _0.display())]
    RemoteUnavailable(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Process exit status for this failed precondition.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyValue(field) => field.exit_code(),
            Self::Unprivileged => 1,
            Self::MissingCacheDir(_) => 50,
            Self::MissingDbDir(_) => 51,
            Self::MissingPacmanConf(_) => 52,
            Self::MissingServiceUser(_) => 150,
            Self::DaemonNotRunning(_) => 151,
            Self::NotMounted(_) => 152,
            Self::RemoteUnavailable(_) => 200,
        }
    }
}
