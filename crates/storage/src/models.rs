use std::fs::Metadata;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// File metadata returned by [`LocalDirectory`](crate::LocalDirectory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Permission bits (including setuid/setgid/sticky)
    pub mode: u32,
}
impl FileInfo {
    pub(crate) fn from_metadata(path: impl AsRef<Path>, metadata: &Metadata) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            size: metadata.len(),
            mode: metadata.permissions().mode() & 0o7777,
        }
    }

    /// The final component of [`path`](Self::path), if it is valid UTF-8.
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}
