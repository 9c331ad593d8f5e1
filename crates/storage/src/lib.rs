//! Local filesystem primitives for pacfs.
//!
//! - [`LocalDirectory`] gives validated, name-based access to the files
//!   directly inside a single directory (the package cache, the sync database
//!   directory, the database directory on the store mount).
//! - [`LockFile`] is the exclusive marker held while cache and database files
//!   are being mutated.
//! - [`swap`] replaces one file with another without ever leaving a partially
//!   written file at the active path.

pub mod error;
mod local;
mod lock;
mod models;
mod path;
pub mod swap;

pub use crate::local::LocalDirectory;
pub use crate::lock::LockFile;
pub use crate::models::FileInfo;
pub use crate::path::validate_name;
