//! Filesystem abstraction
//!
//! Every read and mutation the engine performs goes through [`StoreFs`] so
//! callers can swap in a recording or failure-injecting implementation.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

/// Subset of metadata the engine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    pub len: u64,
}

impl EntryMeta {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    fn from_std(meta: &std::fs::Metadata) -> Self {
        let kind = if meta.file_type().is_symlink() {
            EntryKind::Symlink
        } else if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Self {
            kind,
            len: meta.len(),
        }
    }
}

/// Link type requested when creating a symbolic link.
///
/// Only platforms that distinguish file and directory links look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    File,
    Dir,
}

/// Options for a recursive walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub follow_links: bool,
    pub include_files: bool,
    pub include_dirs: bool,
    /// Maximum depth below the root (1 = direct children)
    pub max_depth: Option<usize>,
}

impl WalkOptions {
    /// Files and directories, following symlinks
    pub fn all() -> Self {
        Self {
            follow_links: true,
            include_files: true,
            include_dirs: true,
            max_depth: None,
        }
    }

    /// Files only, following symlinks
    pub fn files() -> Self {
        Self {
            include_dirs: false,
            ..Self::all()
        }
    }

    /// Directories only, not following symlinks
    pub fn dirs() -> Self {
        Self {
            follow_links: false,
            include_files: false,
            ..Self::all()
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Entry produced by a walk, relative to the walk root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub rel_path: PathBuf,
    pub is_dir: bool,
}

/// Filesystem operations used by the materialization engine
#[async_trait]
pub trait StoreFs: Send + Sync {
    /// Metadata following symlinks
    async fn metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// Metadata of the entry itself
    async fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// Names of the direct children of a directory
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Recursive listing below `root`, excluding `root` itself.
    ///
    /// A missing root yields an empty list; unreadable entries are skipped.
    async fn walk(&self, root: &Path, options: WalkOptions) -> io::Result<Vec<WalkEntry>>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Remove a file, link or directory tree; a missing path is success
    async fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file contents, resolving `src` symlinks and replacing `dst`
    async fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64>;

    async fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Create a symbolic link at `dst` pointing to `src`
    async fn symlink(&self, src: &Path, dst: &Path, kind: LinkKind) -> io::Result<()>;

    /// Whether anything (including a dangling link) exists at `path`
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match self.symlink_metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// [`StoreFs`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn walk_blocking(root: &Path, options: WalkOptions) -> Vec<WalkEntry> {
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_links);
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut entries = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        // With follow_links the reported type is already the target's
        let is_dir = entry.file_type().is_dir();
        if (is_dir && !options.include_dirs) || (!is_dir && !options.include_files) {
            continue;
        }
        let rel_path = match entry.path().strip_prefix(root) {
            Ok(p) => p.to_path_buf(),
            Err(_) => continue,
        };
        entries.push(WalkEntry { rel_path, is_dir });
    }
    entries
}

#[async_trait]
impl StoreFs for LocalFs {
    async fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(EntryMeta::from_std(&meta))
    }

    async fn symlink_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        Ok(EntryMeta::from_std(&meta))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }
        Ok(names)
    }

    async fn walk(&self, root: &Path, options: WalkOptions) -> io::Result<Vec<WalkEntry>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || walk_blocking(&root, options))
            .await
            .map_err(io::Error::other)
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn remove_all(&self, path: &Path) -> io::Result<()> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    async fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        // Never write through a link left at the destination
        if let Ok(meta) = tokio::fs::symlink_metadata(dst).await {
            if meta.file_type().is_symlink() {
                tokio::fs::remove_file(dst).await?;
            }
        }
        tokio::fs::copy(src, dst).await
    }

    async fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        tokio::fs::hard_link(src, dst).await
    }

    #[cfg(unix)]
    async fn symlink(&self, src: &Path, dst: &Path, _kind: LinkKind) -> io::Result<()> {
        tokio::fs::symlink(src, dst).await
    }

    #[cfg(windows)]
    async fn symlink(&self, src: &Path, dst: &Path, kind: LinkKind) -> io::Result<()> {
        match kind {
            LinkKind::Dir => tokio::fs::symlink_dir(src, dst).await,
            LinkKind::File => tokio::fs::symlink_file(src, dst).await,
        }
    }
}
