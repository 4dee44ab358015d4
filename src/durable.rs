//! Durable, crash-safe filesystem operations
//!
//! These are the primitives used once a library variant has been chosen:
//! copy under a byte budget, preallocate, recursive delete and recursive
//! fsync. None of them keeps state between calls, none retries, and none
//! takes locks. Calls on disjoint trees may run concurrently; calls on
//! overlapping trees must be serialized by the caller.
//!
//! # Lock files
//!
//! Any entry whose name ends with [`LOCK_FILE_SUFFIX`] is skipped by
//! [`DurableFileOps::recursive_fsync`]. Closing any descriptor of a file
//! that holds a POSIX advisory lock releases that lock for the whole
//! process, so such files must never be opened here. They are still removed
//! by [`DurableFileOps::recursive_delete`].
//!
//! # Directory symlinks
//!
//! A symlink to a directory is indistinguishable from a directory for these
//! operations: both recursive walks follow it into its target. Callers must
//! guarantee the tree contains no directory symlinks, otherwise a delete
//! can reach outside the intended tree and a cycle will recurse until the
//! stack is exhausted.

use crate::backends::LocalFileSystem;
use crate::error::{ExtractError, Result};
use crate::prealloc::{is_unsupported, Fallocate, PlatformFallocate};
use crate::traits::FileSystem;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Name suffix marking advisory lock files; shared with whoever creates them
pub const LOCK_FILE_SUFFIX: &str = "_lock";

/// Whether the final segment of `path` carries the lock-file suffix
#[must_use]
pub fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(LOCK_FILE_SUFFIX.as_bytes()))
}

/// Copy at most `byte_limit` bytes from `src` to `dst`
///
/// Stops at end-of-stream or once `byte_limit` bytes have been copied,
/// whichever comes first, and never reads past the limit. Returns the exact
/// number of bytes copied. A short count is not an error: compare it with
/// the expected total to detect truncation.
///
/// # Errors
///
/// Returns [`ExtractError::Copy`] if a read or write fails, or if `buffer` is
/// empty while bytes remain to be copied.
pub fn bounded_copy<R, W>(
    src: &mut R,
    dst: &mut W,
    byte_limit: u64,
    buffer: &mut [u8],
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if buffer.is_empty() && byte_limit > 0 {
        return Err(ExtractError::Copy(io::Error::new(
            io::ErrorKind::InvalidInput,
            "copy buffer must not be empty",
        )));
    }

    let mut copied = 0u64;
    while copied < byte_limit {
        let remaining = byte_limit - copied;
        let want = usize::try_from(remaining).map_or(buffer.len(), |r| r.min(buffer.len()));
        let read = match src.read(&mut buffer[..want]) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractError::Copy(e)),
        };
        dst.write_all(&buffer[..read]).map_err(ExtractError::Copy)?;
        copied += read as u64;
    }

    trace!("bounded copy: {copied}/{byte_limit} bytes");
    Ok(copied)
}

/// Stateless service bundling the filesystem seam and the preallocator
#[derive(Debug, Clone, Default)]
pub struct DurableFileOps<F = LocalFileSystem, P = PlatformFallocate> {
    fs: F,
    fallocate: P,
}

impl DurableFileOps<LocalFileSystem, PlatformFallocate> {
    /// Operations on the local filesystem with the target's preallocator
    #[must_use]
    pub fn local() -> Self {
        Self::new(LocalFileSystem::new(), PlatformFallocate::default())
    }
}

impl<F: FileSystem, P: Fallocate> DurableFileOps<F, P> {
    /// Create a service from explicit capabilities
    pub const fn new(fs: F, fallocate: P) -> Self {
        Self { fs, fallocate }
    }

    /// The filesystem backend in use
    pub const fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Reserve `length` bytes of storage for `file` ahead of writing
    ///
    /// `path` is only used to label errors. Platforms or filesystems that
    /// cannot preallocate are treated as success.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] for any failure other than
    /// "not supported", for example running out of space.
    pub fn preallocate(&self, file: &File, path: &Path, length: u64) -> Result<()> {
        if length == 0 || !self.fallocate.is_supported() {
            return Ok(());
        }
        match self.fallocate.fallocate(file, 0, length) {
            Ok(()) => Ok(()),
            Err(e) if is_unsupported(&e) => {
                debug!("preallocation unsupported for {}: {e}", path.display());
                Ok(())
            }
            Err(e) => Err(ExtractError::filesystem(path, e)),
        }
    }

    /// Delete `path`, and everything below it if it is a directory
    ///
    /// A delete that fails is still a success when the path is gone
    /// afterwards, so racing deleters and already-absent paths are fine.
    /// That leniency can hide a genuine failure if another process removes
    /// the path at the same moment.
    ///
    /// Directory symlinks are followed; see the module documentation.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] naming the first entry that could
    /// not be removed and still exists.
    pub fn recursive_delete(&self, path: &Path) -> Result<()> {
        if self.fs.is_dir(path) {
            match self.fs.read_dir(path) {
                Ok(entries) => {
                    for entry in entries {
                        self.recursive_delete(&entry)?;
                    }
                }
                // The remove below decides whether this is fatal
                Err(e) => debug!("cannot list {} for deletion: {e}", path.display()),
            }
        }

        if let Err(e) = self.fs.remove(path) {
            if self.fs.exists(path) {
                return Err(ExtractError::filesystem(path, e));
            }
            trace!("{} already gone: {e}", path.display());
        }
        Ok(())
    }

    /// Flush `path`, and every file below it if it is a directory, to storage
    ///
    /// Lock files are skipped without being opened. Directory entries
    /// themselves are not synced.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] if a directory cannot be listed or
    /// a file cannot be opened or synced.
    pub fn recursive_fsync(&self, path: &Path) -> Result<()> {
        if self.fs.is_dir(path) {
            let entries = self
                .fs
                .read_dir(path)
                .map_err(|e| ExtractError::filesystem(path, e))?;
            for entry in entries {
                self.recursive_fsync(&entry)?;
            }
        } else if is_lock_file(path) {
            debug!("not syncing lock file {}", path.display());
        } else {
            self.fs
                .sync_file(path)
                .map_err(|e| ExtractError::filesystem(path, e))?;
        }
        Ok(())
    }

    /// Delete a single file or empty directory, failing if the call fails
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] if the platform refuses, including
    /// when `path` does not exist.
    pub fn delete_or_fail(&self, path: &Path) -> Result<()> {
        self.fs
            .remove(path)
            .map_err(|e| ExtractError::filesystem(path, e))
    }

    /// Create `dir` and its parents
    ///
    /// Succeeds when creation reports failure but `dir` is a directory
    /// afterwards, e.g. because someone else created it first.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] if `dir` is not a directory after
    /// the attempt.
    pub fn create_dir_all_strict(&self, dir: &Path) -> Result<()> {
        match self.fs.create_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(_) if self.fs.is_dir(dir) => Ok(()),
            Err(e) => Err(ExtractError::filesystem(dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prealloc::NoFallocate;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Preallocator that always fails with a fixed errno
    struct FailingFallocate(i32);

    impl Fallocate for FailingFallocate {
        fn fallocate(&self, _file: &File, _offset: u64, _len: u64) -> io::Result<()> {
            Err(io::Error::from_raw_os_error(self.0))
        }
    }

    /// Reader that yields one byte at a time, interrupting every other call
    struct Stuttering {
        data: Vec<u8>,
        pos: usize,
        interrupt: bool,
    }

    impl Read for Stuttering {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_bounded_copy_stops_at_limit() -> anyhow::Result<()> {
        let mut src = Cursor::new(vec![7u8; 100]);
        let mut dst = Vec::new();
        let mut buffer = [0u8; 16];

        let copied = bounded_copy(&mut src, &mut dst, 40, &mut buffer)?;
        assert_eq!(copied, 40);
        assert_eq!(dst.len(), 40);
        // The rest of the stream is untouched
        assert_eq!(src.position(), 40);
        Ok(())
    }

    #[test]
    fn test_bounded_copy_short_source() -> anyhow::Result<()> {
        let mut src = Cursor::new(b"short".to_vec());
        let mut dst = Vec::new();
        let mut buffer = [0u8; 3];

        let copied = bounded_copy(&mut src, &mut dst, 1024, &mut buffer)?;
        assert_eq!(copied, 5);
        assert_eq!(dst, b"short");
        Ok(())
    }

    #[test]
    fn test_bounded_copy_zero_limit_reads_nothing() -> anyhow::Result<()> {
        let mut src = Cursor::new(b"data".to_vec());
        let mut dst = Vec::new();

        let copied = bounded_copy(&mut src, &mut dst, 0, &mut [])?;
        assert_eq!(copied, 0);
        assert_eq!(src.position(), 0);
        Ok(())
    }

    #[test]
    fn test_bounded_copy_rejects_empty_buffer() {
        let mut src = Cursor::new(b"data".to_vec());
        let mut dst = Vec::new();

        let result = bounded_copy(&mut src, &mut dst, 4, &mut []);
        assert!(matches!(result, Err(ExtractError::Copy(_))));
    }

    #[test]
    fn test_bounded_copy_reissues_interrupted_reads() -> anyhow::Result<()> {
        let mut src = Stuttering {
            data: b"abc".to_vec(),
            pos: 0,
            interrupt: false,
        };
        let mut dst = Vec::new();
        let mut buffer = [0u8; 8];

        let copied = bounded_copy(&mut src, &mut dst, 10, &mut buffer)?;
        assert_eq!(copied, 3);
        assert_eq!(dst, b"abc");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_preallocate_absorbs_unsupported() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("lib.so");
        let file = File::create(&path)?;

        for code in [libc::EOPNOTSUPP, libc::ENOSYS, libc::EINVAL] {
            let ops = DurableFileOps::new(LocalFileSystem::new(), FailingFallocate(code));
            ops.preallocate(&file, &path, 4096)?;
        }
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_preallocate_surfaces_disk_full() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("lib.so");
        let file = File::create(&path)?;

        let ops = DurableFileOps::new(LocalFileSystem::new(), FailingFallocate(libc::ENOSPC));
        let err = ops
            .preallocate(&file, &path, 4096)
            .expect_err("ENOSPC must surface");
        assert!(matches!(err, ExtractError::FileSystem { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
        Ok(())
    }

    #[test]
    fn test_preallocate_without_capability_is_noop() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("lib.so");
        let file = File::create(&path)?;

        let ops = DurableFileOps::new(LocalFileSystem::new(), NoFallocate);
        ops.preallocate(&file, &path, 4096)?;
        assert_eq!(fs::metadata(&path)?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_recursive_delete_removes_tree() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("a");
        fs::create_dir_all(root.join("c"))?;
        fs::write(root.join("b.txt"), b"b")?;
        fs::write(root.join("c").join("d.txt"), b"d")?;

        let ops = DurableFileOps::local();
        ops.recursive_delete(&root)?;
        assert!(!root.exists());

        // Deleting again is not an error
        ops.recursive_delete(&root)?;
        Ok(())
    }

    #[test]
    fn test_recursive_delete_single_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("libfoo.so");
        fs::write(&file, b"elf")?;

        DurableFileOps::local().recursive_delete(&file)?;
        assert!(!file.exists());
        Ok(())
    }

    #[test]
    fn test_recursive_fsync_syncs_files_and_skips_locks() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("lib"))?;
        fs::write(temp_dir.path().join("lib").join("libfoo.so"), b"elf")?;
        fs::write(temp_dir.path().join("dso_lock"), b"")?;

        DurableFileOps::local().recursive_fsync(temp_dir.path())?;
        Ok(())
    }

    #[test]
    fn test_recursive_fsync_missing_path_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("missing.so");

        let err = DurableFileOps::local()
            .recursive_fsync(&missing)
            .expect_err("missing file cannot be synced");
        assert_eq!(err.path(), Some(missing.as_path()));
    }

    #[test]
    fn test_is_lock_file_checks_final_segment() {
        assert!(is_lock_file(Path::new("/data/libs/dso_lock")));
        assert!(is_lock_file(Path::new("_lock")));
        assert!(!is_lock_file(Path::new("/data/x_lock/libfoo.so")));
        assert!(!is_lock_file(Path::new("/data/libs/lock")));
    }

    #[test]
    fn test_delete_or_fail_requires_existing_path() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("libfoo.so");
        fs::write(&file, b"elf")?;

        let ops = DurableFileOps::local();
        ops.delete_or_fail(&file)?;
        assert!(ops.delete_or_fail(&file).is_err());
        Ok(())
    }

    #[test]
    fn test_create_dir_all_strict_tolerates_existing_dir() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().join("x").join("y");

        let ops = DurableFileOps::local();
        ops.create_dir_all_strict(&dir)?;
        ops.create_dir_all_strict(&dir)?;
        assert!(dir.is_dir());
        Ok(())
    }

    #[test]
    fn test_create_dir_all_strict_fails_over_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("occupied");
        fs::write(&file, b"")?;

        let result = DurableFileOps::local().create_dir_all_strict(&file);
        assert!(matches!(result, Err(ExtractError::FileSystem { .. })));
        Ok(())
    }
}
