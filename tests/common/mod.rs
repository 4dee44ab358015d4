use soextract::backends::LocalFileSystem;
use soextract::traits::FileSystem;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub mod tree;

/// Filesystem call observed by [`RecordingFileSystem`]
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    ReadDir(PathBuf),
    Remove(PathBuf),
    SyncFile(PathBuf),
    SyncDir(PathBuf),
    Rename(PathBuf, PathBuf),
}

/// Local filesystem wrapper that records calls and injects failures
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingFileSystem {
    inner: LocalFileSystem,
    calls: Mutex<Vec<FsCall>>,
    /// `remove` on these paths fails without touching the disk
    refuse_remove: HashSet<PathBuf>,
    /// `remove` on these paths deletes the entry but still reports failure,
    /// as if another process won the race
    lose_remove_race: HashSet<PathBuf>,
    /// `read_dir` on these paths fails
    refuse_list: HashSet<PathBuf>,
    /// `rename` onto these destinations fails
    refuse_rename: HashSet<PathBuf>,
}

#[allow(dead_code)]
impl RecordingFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing_remove(mut self, path: impl Into<PathBuf>) -> Self {
        self.refuse_remove.insert(path.into());
        self
    }

    pub fn losing_remove_race(mut self, path: impl Into<PathBuf>) -> Self {
        self.lose_remove_race.insert(path.into());
        self
    }

    pub fn refusing_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.refuse_list.insert(path.into());
        self
    }

    pub fn refusing_rename(mut self, to: impl Into<PathBuf>) -> Self {
        self.refuse_rename.insert(to.into());
        self
    }

    pub fn calls(&self) -> Vec<FsCall> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    pub fn synced(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FsCall::SyncFile(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FsCall::Remove(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: FsCall) {
        self.calls.lock().expect("call log poisoned").push(call);
    }
}

impl FileSystem for RecordingFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.record(FsCall::ReadDir(path.to_path_buf()));
        if self.refuse_list.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.read_dir(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.record(FsCall::Remove(path.to_path_buf()));
        if self.refuse_remove.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if self.lose_remove_race.contains(path) {
            self.inner.remove(path)?;
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.inner.remove(path)
    }

    fn sync_file(&self, path: &Path) -> io::Result<()> {
        self.record(FsCall::SyncFile(path.to_path_buf()));
        self.inner.sync_file(path)
    }

    fn sync_dir(&self, path: &Path) -> io::Result<()> {
        self.record(FsCall::SyncDir(path.to_path_buf()));
        self.inner.sync_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn create_file(&self, path: &Path) -> io::Result<File> {
        self.inner.create_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.record(FsCall::Rename(from.to_path_buf(), to.to_path_buf()));
        if self.refuse_rename.contains(to) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.inner.rename(from, to)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
