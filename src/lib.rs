//! # soextract
//!
//! Selection and durable extraction of native shared libraries:
//! - [`abi`] ranks ABI-tagged library variants against the host's preferences
//! - [`host`] reports which ABIs the running process can load
//! - [`durable`] copies, preallocates, deletes and fsyncs without ever
//!   touching advisory lock files
//! - [`extract`] composes the above into a crash-safe extraction
//! - [`blob`] encodes the dependency fingerprint an external cache stores
//!
//! ## Example
//!
//! ```rust,no_run
//! use soextract::{host, DurableFileOps, Extractor};
//! use std::fs::File;
//! use std::path::Path;
//!
//! # fn example() -> soextract::Result<()> {
//! let supported = host::detect(&[]).supported_abis();
//! let variants = [("armeabi-v7a", "lib/armeabi-v7a/libfoo.so"), ("arm64-v8a", "lib/arm64-v8a/libfoo.so")];
//! if let Some(source) = soextract::extract::select_variant(&supported, variants) {
//!     let mut file = File::open(source).map_err(|e| soextract::ExtractError::filesystem(source, e))?;
//!     let len = file.metadata().map_err(|e| soextract::ExtractError::filesystem(source, e))?.len();
//!     Extractor::new(DurableFileOps::local()).extract(&mut file, len, Path::new("libs"), "libfoo.so")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod backends;
pub mod blob;
pub mod cli;
pub mod durable;
pub mod error;
pub mod extract;
pub mod host;
pub mod prealloc;
pub mod traits;

pub use abi::SupportedAbis;
pub use blob::DependencyBlob;
pub use durable::{bounded_copy, DurableFileOps, LOCK_FILE_SUFFIX};
pub use error::{ExtractError, Result};
pub use extract::Extractor;
pub use host::HostAbi;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
