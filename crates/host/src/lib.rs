//! Host environment capability.
//!
//! Everything pacfs needs from the machine it runs on (and from the content
//! store daemon running on it) goes through [`HostEnvironment`], so the sync
//! logic can be exercised without root, a service account, or a real store
//! mount. [`SystemHost`] is the real thing; [`MockHost`] (behind the `mock`
//! feature) is a scriptable double for tests.

pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod mounts;
mod process;
mod system;

use crate::error::Result;
#[cfg(feature = "mock")]
pub use crate::mock::MockHost;
pub use crate::system::SystemHost;
use std::path::Path;

/// Identifier the content store returned for a published file.
pub type ContentId = String;

pub trait HostEnvironment {
    /// Whether the current effective user is privileged (root).
    fn is_privileged(&self) -> Result<bool>;

    /// Whether a user account called `name` exists.
    fn user_exists(&self, name: &str) -> Result<bool>;

    /// Whether a process called `name` is currently running.
    fn is_process_running(&self, name: &str) -> Result<bool>;

    /// Whether a filesystem is mounted exactly at `path`.
    fn is_mounted(&self, path: &Path) -> Result<bool>;

    /// Add `file` to the content store as the service account.
    ///
    /// The object is added content-addressed with raw leaves and is **not**
    /// pinned; the call returns once the local store has the object and does
    /// not wait for it to be replicated anywhere.
    fn publish(&self, file: &Path) -> Result<ContentId>;
}
