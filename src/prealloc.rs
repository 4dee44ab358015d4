//! Disk space preallocation
//!
//! Reserving the full size of a library before writing it reduces
//! fragmentation and surfaces out-of-space conditions before any bytes are
//! copied. Not every platform or filesystem can do this, so the raw call is
//! behind the [`Fallocate`] capability and "not supported" answers are
//! recognised by [`is_unsupported`].

use std::fs::File;
use std::io;

/// Capability for reserving backing storage for a file
pub trait Fallocate: Send + Sync {
    /// Reserve `len` bytes starting at `offset`
    ///
    /// # Errors
    ///
    /// Returns the raw platform error; callers decide which errors mean
    /// "unsupported".
    fn fallocate(&self, file: &File, offset: u64, len: u64) -> io::Result<()>;

    /// Whether this implementation talks to the platform at all
    fn is_supported(&self) -> bool {
        true
    }
}

/// `posix_fallocate(3)` backed preallocation
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixFallocate;

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
impl Fallocate for PosixFallocate {
    fn fallocate(&self, file: &File, offset: u64, len: u64) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let too_large = || io::Error::from_raw_os_error(libc::EFBIG);
        let offset = libc::off_t::try_from(offset).map_err(|_| too_large())?;
        let len = libc::off_t::try_from(len).map_err(|_| too_large())?;

        // SAFETY: the descriptor is owned by `file`, which outlives the call
        let rc = unsafe { libc::posix_fallocate(file.as_raw_fd(), offset, len) };
        // posix_fallocate returns the error number instead of setting errno
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(rc))
        }
    }
}

/// Preallocation for platforms without the capability; always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallocate;

impl Fallocate for NoFallocate {
    fn fallocate(&self, _file: &File, _offset: u64, _len: u64) -> io::Result<()> {
        Ok(())
    }

    fn is_supported(&self) -> bool {
        false
    }
}

/// Preallocator selected for the compilation target
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub type PlatformFallocate = PosixFallocate;

/// Preallocator selected for the compilation target
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub type PlatformFallocate = NoFallocate;

#[cfg(unix)]
const UNSUPPORTED_ERRNOS: &[i32] = &[libc::EOPNOTSUPP, libc::ENOTSUP, libc::ENOSYS, libc::EINVAL];
#[cfg(not(unix))]
const UNSUPPORTED_ERRNOS: &[i32] = &[libc::ENOSYS, libc::EINVAL];

/// Whether `err` means the platform or filesystem lacks preallocation
///
/// `EOPNOTSUPP`, `ENOSYS` and `EINVAL` all show up in practice for
/// filesystems that cannot preallocate.
#[must_use]
pub fn is_unsupported(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    let Some(code) = err.raw_os_error() else {
        return false;
    };
    UNSUPPORTED_ERRNOS.contains(&code)
}
