//! Test doubles for [`StoreFs`]

use crate::cache::fs::{EntryMeta, LinkKind, LocalFs, StoreFs, WalkEntry, WalkOptions};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded filesystem call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    Metadata(PathBuf),
    SymlinkMetadata(PathBuf),
    ReadDir(PathBuf),
    Walk(PathBuf),
    CreateDirAll(PathBuf),
    Write(PathBuf),
    RemoveAll(PathBuf),
    CopyFile(PathBuf, PathBuf),
    HardLink(PathBuf, PathBuf),
    Symlink(PathBuf, PathBuf, LinkKind),
}

impl FsCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Metadata(_) | Self::SymlinkMetadata(_) | Self::ReadDir(_) | Self::Walk(_)
        )
    }
}

/// Local filesystem that records every call and can refuse hard links or
/// removals
#[derive(Debug, Default)]
pub struct RecordingFs {
    calls: Mutex<Vec<FsCall>>,
    hard_link_errno: Option<i32>,
    remove_errno: Option<i32>,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every hard link with the given OS error code
    pub fn failing_hard_links(errno: i32) -> Self {
        Self {
            hard_link_errno: Some(errno),
            ..Self::default()
        }
    }

    /// Fail every recursive removal with the given OS error code
    pub fn failing_removals(errno: i32) -> Self {
        Self {
            remove_errno: Some(errno),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<FsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<FsCall> {
        self.calls().into_iter().filter(FsCall::is_mutation).collect()
    }

    fn record(&self, call: FsCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StoreFs for RecordingFs {
    async fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        self.record(FsCall::Metadata(path.to_path_buf()));
        LocalFs.metadata(path).await
    }

    async fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        self.record(FsCall::SymlinkMetadata(path.to_path_buf()));
        LocalFs.symlink_metadata(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        self.record(FsCall::ReadDir(path.to_path_buf()));
        LocalFs.read_dir(path).await
    }

    async fn walk(&self, root: &Path, options: WalkOptions) -> io::Result<Vec<WalkEntry>> {
        self.record(FsCall::Walk(root.to_path_buf()));
        LocalFs.walk(root, options).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.record(FsCall::CreateDirAll(path.to_path_buf()));
        LocalFs.create_dir_all(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.record(FsCall::Write(path.to_path_buf()));
        LocalFs.write(path, contents).await
    }

    async fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.record(FsCall::RemoveAll(path.to_path_buf()));
        match self.remove_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => LocalFs.remove_all(path).await,
        }
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        self.record(FsCall::CopyFile(src.to_path_buf(), dst.to_path_buf()));
        LocalFs.copy_file(src, dst).await
    }

    async fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        self.record(FsCall::HardLink(src.to_path_buf(), dst.to_path_buf()));
        match self.hard_link_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => LocalFs.hard_link(src, dst).await,
        }
    }

    async fn symlink(&self, src: &Path, dst: &Path, kind: LinkKind) -> io::Result<()> {
        self.record(FsCall::Symlink(src.to_path_buf(), dst.to_path_buf(), kind));
        LocalFs.symlink(src, dst, kind).await
    }
}
