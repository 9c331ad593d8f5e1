use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop publishing altogether. Failures for individual files
/// are logged and counted instead.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("unable to list the package cache")]
    List,
    #[display("interrupted while publishing")]
    Interrupted,
}
