//! Helpers for building small directory trees in tests

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Create every file in `files` (relative to `root`) with its name as content
#[allow(dead_code)]
pub fn build_tree(root: &Path, files: &[&str]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|relative| {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent directory");
            }
            fs::write(&path, relative.as_bytes()).expect("Failed to write file");
            path
        })
        .collect()
}

/// Every path below `root`, excluding `root` itself, sorted
#[allow(dead_code)]
pub fn list_tree(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| entry.expect("Failed to walk tree").into_path())
        .collect();
    paths.sort();
    paths
}
