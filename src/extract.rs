//! Library extraction pipeline
//!
//! Materializes one chosen library into a target directory:
//!
//! 1. create the directory (tolerating a concurrent creator)
//! 2. write into `<name>.tmp`, preallocating the expected size first
//! 3. copy at most the expected number of bytes
//! 4. fsync the temp file and rename it over `<name>`
//! 5. fsync the files in the directory, then the directory itself
//!
//! A crash at any point leaves either the previous library or a stray temp
//! file, never a truncated file under the final name.

use crate::abi::SupportedAbis;
use crate::durable::{bounded_copy, DurableFileOps};
use crate::error::{ExtractError, Result};
use crate::prealloc::Fallocate;
use crate::traits::FileSystem;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default copy buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Suffix of the in-progress file next to the final destination
const TEMP_SUFFIX: &str = ".tmp";

/// Whether `name` is usable as a single entry inside a directory
///
/// Rejects empty names, `.`, `..` and anything containing a path separator.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Extracts library streams to disk durably
#[derive(Debug, Clone)]
pub struct Extractor<F, P> {
    ops: DurableFileOps<F, P>,
    buffer_size: usize,
}

impl<F: FileSystem, P: Fallocate> Extractor<F, P> {
    /// Create an extractor with the default buffer size
    pub const fn new(ops: DurableFileOps<F, P>) -> Self {
        Self {
            ops,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Use a different copy buffer size; zero falls back to the default
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = if buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            buffer_size
        };
        self
    }

    /// The underlying durable operations
    pub const fn ops(&self) -> &DurableFileOps<F, P> {
        &self.ops
    }

    /// Write `expected_len` bytes from `reader` to `dest_dir/file_name`
    ///
    /// Returns the final path of the library once it and the rest of
    /// `dest_dir` are on stable storage.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Truncated`] if `reader` ends before `expected_len`
    ///   bytes; the temp file is removed
    /// - [`ExtractError::InvalidFileName`] if `file_name` is not a plain name
    /// - [`ExtractError::FileSystem`] for create, preallocate, copy, sync or
    ///   rename failures; past the directory creation the temp file is
    ///   removed before returning
    pub fn extract<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        expected_len: u64,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf> {
        if !is_plain_file_name(file_name) {
            return Err(ExtractError::InvalidFileName(file_name.to_string()));
        }
        debug!(
            "extracting {file_name} into {} via {} backend",
            dest_dir.display(),
            self.ops.filesystem().name()
        );
        self.ops.create_dir_all_strict(dest_dir)?;

        let final_path = dest_dir.join(file_name);
        let mut temp_name = OsString::from(file_name);
        temp_name.push(TEMP_SUFFIX);
        let temp_path = dest_dir.join(temp_name);

        let copied = match self.write_temp(reader, expected_len, &temp_path) {
            Ok(copied) => copied,
            Err(e) => {
                self.discard(&temp_path);
                return Err(e);
            }
        };
        if copied != expected_len {
            self.discard(&temp_path);
            return Err(ExtractError::Truncated {
                path: final_path,
                expected: expected_len,
                copied,
            });
        }

        if let Err(e) = self.publish(&temp_path, &final_path) {
            self.discard(&temp_path);
            return Err(e);
        }
        self.ops.recursive_fsync(dest_dir)?;
        self.ops
            .filesystem()
            .sync_dir(dest_dir)
            .map_err(|e| ExtractError::filesystem(dest_dir, e))?;

        info!("extracted {} ({copied} bytes)", final_path.display());
        Ok(final_path)
    }

    /// Make the temp file durable and move it under its final name
    fn publish(&self, temp_path: &Path, final_path: &Path) -> Result<()> {
        self.ops.recursive_fsync(temp_path)?;
        self.ops
            .filesystem()
            .rename(temp_path, final_path)
            .map_err(|e| ExtractError::filesystem(final_path, e))
    }

    fn write_temp<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        expected_len: u64,
        temp_path: &Path,
    ) -> Result<u64> {
        let mut file = self
            .ops
            .filesystem()
            .create_file(temp_path)
            .map_err(|e| ExtractError::filesystem(temp_path, e))?;
        self.ops.preallocate(&file, temp_path, expected_len)?;

        let mut buffer = vec![0u8; self.buffer_size];
        bounded_copy(reader, &mut file, expected_len, &mut buffer).map_err(|e| match e {
            ExtractError::Copy(source) => ExtractError::filesystem(temp_path, source),
            other => other,
        })
    }

    fn discard(&self, temp_path: &Path) {
        if let Err(e) = self.ops.recursive_delete(temp_path) {
            debug!("could not remove {}: {e}", temp_path.display());
        }
    }
}

/// Pick the most preferred library among ABI-tagged candidates
///
/// Thin convenience over [`SupportedAbis::best`] returning only the value.
pub fn select_variant<S, T, I>(supported: &SupportedAbis, candidates: I) -> Option<T>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, T)>,
{
    supported.best(candidates).map(|(abi, value)| {
        debug!("selected ABI {abi}");
        value
    })
}
