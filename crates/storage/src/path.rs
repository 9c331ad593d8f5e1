//! Name validation.
//!
//! Everything in pacfs addresses files *directly* inside a known directory:
//! `core.db` in the sync database directory, a package archive in the cache.
//! Names that come from configuration files must therefore never be able to
//! point anywhere else.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates that `name` is exactly one plain path component.
///
/// Trailing slashes are tolerated and stripped; anything that would descend
/// into a subdirectory, climb out of the directory, or reference the
/// directory itself is rejected. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized name if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use pacfs_storage::validate_name;
/// assert_eq!(validate_name("core.db").unwrap(), Path::new("core.db"));
/// assert_eq!(validate_name("core.db/").unwrap(), Path::new("core.db"));
/// assert!(validate_name("../core.db").is_err());
/// assert!(validate_name("sync/core.db").is_err());
/// assert!(validate_name("/core.db").is_err());
/// assert!(validate_name("a\0b").is_err());
/// ```
pub fn validate_name(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let mut components = name.components();
    match (components.next(), components.next()) {
        // Null bytes pass through Path::components() on Unix but cause
        // truncation in C-based syscalls.
        (Some(Component::Normal(s)), None) if !s.as_encoded_bytes().contains(&0) => Ok(PathBuf::from(s)),
        _ => exn::bail!(ErrorKind::InvalidPath(name.to_path_buf())),
    }
}
