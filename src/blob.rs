//! Dependency fingerprint blobs
//!
//! A blob records which container file an extraction came from, when that
//! file was last modified and which version of the application shipped it.
//! An external cache stores the bytes and compares them on the next start;
//! this module only builds and parses them.
//!
//! # Layout (version 1, little-endian)
//!
//! ```text
//! u8   version            = 1
//! u32  path length (n)
//! [n]  canonical path, UTF-8
//! i64  modification time, milliseconds since the Unix epoch
//! i32  version counter
//! ```

use crate::error::{ExtractError, Result};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

/// The only layout currently defined
pub const BLOB_FORMAT_VERSION: u8 = 1;

/// Source of the application's version counter
///
/// Returning `None` means the lookup failed; the blob then records `0`.
pub trait VersionSource {
    /// Current version counter, if it could be determined
    fn version_code(&self) -> Option<i32>;
}

/// Version source with a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedVersion(pub i32);

impl VersionSource for FixedVersion {
    fn version_code(&self) -> Option<i32> {
        Some(self.0)
    }
}

/// Fingerprint of the file a library was extracted from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyBlob {
    /// Canonical path of the container file
    pub path: PathBuf,
    /// Modification time in milliseconds since the Unix epoch
    pub modified_ms: i64,
    /// Application version counter
    pub version_code: i32,
}

impl DependencyBlob {
    /// Fingerprint `path` as it is on disk right now
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::FileSystem`] if the path cannot be resolved or
    /// stat'ed, and [`ExtractError::InvalidBlob`] if its canonical form is not
    /// valid UTF-8.
    pub fn for_file(path: &Path, versions: &dyn VersionSource) -> Result<Self> {
        let canonical = fs::canonicalize(path).map_err(|e| ExtractError::filesystem(path, e))?;
        if canonical.to_str().is_none() {
            return Err(ExtractError::InvalidBlob(format!(
                "path is not valid UTF-8: {}",
                canonical.display()
            )));
        }
        let metadata =
            fs::metadata(&canonical).map_err(|e| ExtractError::filesystem(&canonical, e))?;
        let mtime = FileTime::from_last_modification_time(&metadata);
        let modified_ms = mtime
            .unix_seconds()
            .saturating_mul(1000)
            .saturating_add(i64::from(mtime.nanoseconds() / 1_000_000));

        Ok(Self {
            path: canonical,
            modified_ms,
            version_code: versions.version_code().unwrap_or(0),
        })
    }

    /// Serialize into the current layout
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidBlob`] if the path is not UTF-8 or is
    /// longer than `u32::MAX` bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let path = self.path.to_str().ok_or_else(|| {
            ExtractError::InvalidBlob(format!("path is not valid UTF-8: {}", self.path.display()))
        })?;
        let path_len = u32::try_from(path.len())
            .map_err(|_| ExtractError::InvalidBlob("path too long".to_string()))?;

        let mut out = Vec::with_capacity(1 + 4 + path.len() + 8 + 4);
        out.push(BLOB_FORMAT_VERSION);
        out.extend_from_slice(&path_len.to_le_bytes());
        out.extend_from_slice(path.as_bytes());
        out.extend_from_slice(&self.modified_ms.to_le_bytes());
        out.extend_from_slice(&self.version_code.to_le_bytes());
        Ok(out)
    }

    /// Parse a blob, rejecting unknown versions and malformed input
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidBlob`] on an unknown version, truncated
    /// or oversized input, or a non-UTF-8 path.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes };
        let version = reader.take::<1>()?[0];
        if version != BLOB_FORMAT_VERSION {
            return Err(ExtractError::InvalidBlob(format!(
                "unknown format version {version}"
            )));
        }

        let path_len = u32::from_le_bytes(reader.take::<4>()?) as usize;
        let path = reader.take_slice(path_len)?;
        let path = std::str::from_utf8(path)
            .map_err(|e| ExtractError::InvalidBlob(format!("path is not valid UTF-8: {e}")))?;
        let modified_ms = i64::from_le_bytes(reader.take::<8>()?);
        let version_code = i32::from_le_bytes(reader.take::<4>()?);

        if !reader.bytes.is_empty() {
            return Err(ExtractError::InvalidBlob(format!(
                "{} trailing bytes",
                reader.bytes.len()
            )));
        }

        Ok(Self {
            path: PathBuf::from(path),
            modified_ms,
            version_code,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(ExtractError::InvalidBlob(format!(
                "truncated: needed {len} bytes, {} left",
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}
