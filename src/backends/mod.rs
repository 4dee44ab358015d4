//! Filesystem backend implementations
//!
//! Concrete implementations of the [`FileSystem`](crate::traits::FileSystem) trait.

pub mod local;

pub use local::LocalFileSystem;
