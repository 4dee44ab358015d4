//! FileSystem trait for the operations durable extraction needs
//!
//! This trait is the seam between [`DurableFileOps`](crate::durable::DurableFileOps)
//! and the platform. The local backend maps it onto `std::fs`; tests swap in
//! instrumented doubles to observe which paths get opened or removed.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Minimal synchronous filesystem interface
///
/// Implementations must not follow any locking protocol of their own;
/// callers serialize access to overlapping trees.
pub trait FileSystem: Send + Sync {
    /// Whether `path` currently names a directory
    ///
    /// Symbolic links are followed, so a link to a directory reports `true`.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether anything exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Full paths of the entries directly inside `path`
    ///
    /// # Errors
    ///
    /// Returns the platform error if `path` cannot be listed.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Remove a file or an empty directory
    ///
    /// # Errors
    ///
    /// Returns the platform error if the entry could not be removed.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Open `path` read-only, flush it to stable storage, then release it
    ///
    /// The handle must be closed before returning on every path, including
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the open or the sync fails.
    fn sync_file(&self, path: &Path) -> io::Result<()>;

    /// Flush the entries of directory `path` to stable storage
    ///
    /// Makes a preceding create or rename inside `path` durable. The
    /// entries' contents are not synced.
    ///
    /// # Errors
    ///
    /// Returns the platform error if the directory cannot be opened or
    /// synced.
    fn sync_dir(&self, path: &Path) -> io::Result<()>;

    /// Create `path` and all missing parents
    ///
    /// # Errors
    ///
    /// Returns the platform error if any component could not be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create or truncate `path` for writing
    ///
    /// # Errors
    ///
    /// Returns the platform error if the file could not be created.
    fn create_file(&self, path: &Path) -> io::Result<File>;

    /// Atomically replace `to` with `from`
    ///
    /// # Errors
    ///
    /// Returns the platform error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str {
        "unknown"
    }
}
