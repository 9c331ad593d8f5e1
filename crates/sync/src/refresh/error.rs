use derive_more::{Display, Error};
use pacfs_storage::swap::SwapStep;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors for a single repository. Each one stops the refresh before
/// any later repository is looked at.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The repository name can't be used as a file name.
    #[display("invalid repository name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// There is no local database for a tracked repository.
    #[display("local database for `{_0}` does not exist")]
    MissingLocalDatabase(#[error(not(source))] String),
    /// A database file could not be inspected.
    #[display("unable to inspect database files for `{_0}`")]
    Stat(#[error(not(source))] String),
    /// Replacing the local database failed part-way.
    #[display("replacing database for `{repository}` failed at step: {step}")]
    Swap {
        repository: String,
        step: SwapStep,
    },
    #[display("interrupted while refreshing databases")]
    Interrupted,
}
