//! Name-based access to the files directly inside one directory.

use crate::error::{ErrorKind, Result};
use crate::{FileInfo, path::validate_name};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// A directory on the local filesystem.
///
/// All files are addressed by a single validated name relative to the root
/// (see [`validate_name`](crate::validate_name)); nothing here ever descends
/// into subdirectories.
///
/// # Examples
///
/// ```no_run
/// use pacfs_storage::LocalDirectory;
///
/// # fn example() -> pacfs_storage::error::Result<()> {
/// let sync = LocalDirectory::open("/var/lib/pacman/sync")?;
/// let core = sync.stat("core.db")?;
/// println!("{} is {} bytes", core.path.display(), core.size);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}
impl LocalDirectory {
    /// Open an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, does not exist, or is
    /// not a directory. Unlike creating the directory on demand, this never
    /// modifies the filesystem.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        let metadata = fs::metadata(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(root));
        }
        // A directory can be stat-able but not listable (mode 0711 and friends,
        // or a stalled FUSE mount). Find out now rather than halfway through.
        fs::read_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a file name inside this directory.
    pub fn path(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_name(name)?;
        Ok(self.root.join(validated))
    }

    pub fn stat(&self, name: impl AsRef<Path>) -> Result<FileInfo> {
        let path = self.path(name)?;
        let metadata = fs::metadata(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        Ok(FileInfo::from_metadata(&path, &metadata))
    }

    pub fn delete(&self, name: impl AsRef<Path>) -> Result<()> {
        let path = self.path(name)?;
        Ok(fs::remove_file(&path).map_err(|e| ErrorKind::from_io(e, &path))?)
    }

    /// List the regular files directly inside this directory, sorted by path.
    ///
    /// Subdirectories, symlinks, sockets and the like are skipped. Entries
    /// that vanish or can't be inspected while listing are skipped with a
    /// warning rather than failing the whole listing.
    pub fn files(&self) -> Result<Vec<FileInfo>> {
        let entries = fs::read_dir(&self.root).map_err(|e| ErrorKind::from_io(e, &self.root))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(directory = %self.root.display(), error = %e, "Unable to read directory entry");
                    continue;
                },
            };
            let path = entry.path();
            // `DirEntry::file_type()` does not follow symlinks.
            match entry.file_type() {
                Ok(kind) if kind.is_file() => {},
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unable to determine file type");
                    continue;
                },
            }
            match entry.metadata() {
                Ok(metadata) => files.push(FileInfo::from_metadata(&path, &metadata)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Unable to read file metadata"),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// `fsync` a directory so that renames inside it survive a crash.
pub(crate) fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

/// The directory containing `path`, treating a bare file name as relative to
/// the current directory.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
