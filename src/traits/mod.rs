//! Core traits for filesystem abstraction
//!
//! The durable operations are written against these traits so that the
//! local backend and test doubles are interchangeable.

pub mod filesystem;

pub use filesystem::FileSystem;
