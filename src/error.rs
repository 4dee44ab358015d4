//! Error types for ABI selection and durable extraction
//!
//! Every platform-level failure that has a path attached is surfaced as
//! [`ExtractError::FileSystem`]. Nothing in this crate retries; that policy
//! belongs to the caller.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by the extraction core
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A delete, list, open, create or sync call failed for `path`
    #[error("filesystem error on {}: {source}", .path.display())]
    FileSystem {
        /// Path the failing operation was applied to
        path: PathBuf,
        /// Underlying platform error
        #[source]
        source: io::Error,
    },

    /// Reading from the source stream or writing to the destination failed
    #[error("copy failed: {0}")]
    Copy(#[source] io::Error),

    /// The source stream ended before the expected number of bytes arrived
    #[error("truncated copy to {}: expected {expected} bytes, copied {copied}", .path.display())]
    Truncated {
        /// Destination that received the short copy
        path: PathBuf,
        /// Bytes the caller expected
        expected: u64,
        /// Bytes actually copied
        copied: u64,
    },

    /// The library name is not a single plain path component
    #[error("invalid library file name: {0:?}")]
    InvalidFileName(String),

    /// A dependency blob could not be decoded or built
    #[error("invalid dependency blob: {0}")]
    InvalidBlob(String),
}

impl ExtractError {
    /// Wrap an I/O error together with the path it happened on
    pub fn filesystem(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::FileSystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Path associated with this error, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileSystem { path, .. } | Self::Truncated { path, .. } => Some(path),
            Self::Copy(_) | Self::InvalidFileName(_) | Self::InvalidBlob(_) => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExtractError>;
