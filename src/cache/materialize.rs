//! Moving content between the workspace and the store
//!
//! Save is always a dereferencing copy. Restore either symlinks into the
//! store or hard-links each file, copying whenever a link is refused.
//!
//! Every operation records an [`Action`] before touching the filesystem.
//! With `dry_run` set the action is recorded and logged and nothing else
//! happens, so dry and real runs share the same journal.
//!
//! Hard-linked restores share inodes with the store: writing to a restored
//! file in place also changes the stored copy.

use crate::cache::fs::{LinkKind, StoreFs, WalkOptions};
use crate::error::{PersistError, PersistResult};
use futures_util::future::{join_all, try_join_all};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(windows)]
const ERROR_NOT_SAME_DEVICE: i32 = 17;

/// A single materialization step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Wipe `dst` and mirror the directory `src` into it
    SaveDir { src: PathBuf, dst: PathBuf },
    /// Copy one file into the store
    SaveFile { src: PathBuf, dst: PathBuf },
    /// Point `dst` at `src` with a symbolic link
    Symlink { src: PathBuf, dst: PathBuf },
    /// Replace `dst` with hard links (or copies) of `src`
    LinkOrCopy { src: PathBuf, dst: PathBuf },
    /// A hard link was refused and the file was copied instead
    LinkFallback {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },
}

/// Whether a failed hard link should degrade to a copy
fn is_recoverable_link_error(err: &io::Error) -> bool {
    if let Some(code) = err.raw_os_error() {
        #[cfg(unix)]
        if [
            libc::EXDEV,
            libc::EPERM,
            libc::EACCES,
            libc::EMLINK,
            libc::ENOTSUP,
            libc::EOPNOTSUPP,
        ]
        .contains(&code)
        {
            return true;
        }
        #[cfg(windows)]
        if code == ERROR_NOT_SAME_DEVICE {
            return true;
        }
    }
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::Unsupported
    )
}

fn io_err(context: &str, path: &Path, source: io::Error) -> PersistError {
    PersistError::io(format!("{context} {}", path.display()), source)
}

/// Executes save and restore strategies against a [`StoreFs`]
pub struct Materializer<'a> {
    fs: &'a dyn StoreFs,
    dry_run: bool,
    actions: Vec<Action>,
}

impl<'a> Materializer<'a> {
    pub fn new(fs: &'a dyn StoreFs, dry_run: bool) -> Self {
        Self {
            fs,
            dry_run,
            actions: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Actions recorded so far, in execution order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    /// Number of hard links that degraded to copies
    pub fn fallback_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::LinkFallback { .. }))
            .count()
    }

    /// Mirror the directory `src` into `dst`, removing whatever `dst` held before
    pub async fn copy_with_wipe(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        self.actions.push(Action::SaveDir {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        if self.dry_run {
            info!(
                "(dry-run) would wipe '{}' and copy '{}/.' -> '{}/'",
                dst.display(),
                src.display(),
                dst.display()
            );
            return Ok(());
        }

        self.fs
            .create_dir_all(dst)
            .await
            .map_err(|e| io_err("creating", dst, e))?;
        self.wipe_children(dst).await;
        self.copy_tree(src, dst).await
    }

    /// Copy a single file, creating its parent directory
    pub async fn copy_file(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        self.actions.push(Action::SaveFile {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        if self.dry_run {
            info!("(dry-run) would copy '{}' -> '{}'", src.display(), dst.display());
            return Ok(());
        }

        self.ensure_parent(dst).await?;
        self.fs
            .copy_file(src, dst)
            .await
            .map_err(|e| io_err("copying to", dst, e))?;
        Ok(())
    }

    /// Replace `dst` with hard links to `src`, copying files that cannot be linked
    pub async fn link_or_copy(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        self.actions.push(Action::LinkOrCopy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        if self.dry_run {
            info!(
                "(dry-run) would hardlink/copy '{}' -> '{}'",
                src.display(),
                dst.display()
            );
            return Ok(());
        }

        self.fs
            .remove_all(dst)
            .await
            .map_err(|e| io_err("removing", dst, e))?;

        let meta = self
            .fs
            .symlink_metadata(src)
            .await
            .map_err(|e| io_err("inspecting", src, e))?;
        if meta.is_dir() {
            self.link_tree(src, dst).await
        } else {
            self.link_or_copy_file(src, dst).await
        }
    }

    /// Replace `dst` with a symbolic link to `src`
    pub async fn symlink_restore(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        self.actions.push(Action::Symlink {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
        if self.dry_run {
            info!("(dry-run) would symlink '{}' -> '{}'", dst.display(), src.display());
            return Ok(());
        }

        self.ensure_parent(dst).await?;
        if let Err(e) = self.fs.remove_all(dst).await {
            debug!("Could not clear {}: {}", dst.display(), e);
        }

        // Some platforms fix the link type at creation
        let kind = match self.fs.metadata(src).await {
            Ok(meta) if meta.is_dir() => LinkKind::Dir,
            _ => LinkKind::File,
        };
        self.fs
            .symlink(src, dst, kind)
            .await
            .map_err(|e| io_err("linking", dst, e))?;

        info!("link: {} -> {}", dst.display(), src.display());
        Ok(())
    }

    async fn ensure_parent(&self, path: &Path) -> PersistResult<()> {
        if let Some(parent) = path.parent() {
            self.fs
                .create_dir_all(parent)
                .await
                .map_err(|e| io_err("creating", parent, e))?;
        }
        Ok(())
    }

    /// Best-effort removal of every child of `dir`
    async fn wipe_children(&self, dir: &Path) {
        let children = match self.fs.read_dir(dir).await {
            Ok(children) => children,
            Err(e) => {
                debug!("Nothing to wipe in {}: {}", dir.display(), e);
                return;
            }
        };

        let paths: Vec<PathBuf> = children.iter().map(|name| dir.join(name)).collect();
        let results = join_all(paths.iter().map(|p| self.fs.remove_all(p))).await;
        for (path, result) in paths.iter().zip(results) {
            if let Err(e) = result {
                debug!("Failed to wipe {}: {}", path.display(), e);
            }
        }
    }

    /// Dereferencing recursive copy of `src` into `dst`
    async fn copy_tree(&self, src: &Path, dst: &Path) -> PersistResult<()> {
        let entries = self
            .fs
            .walk(src, WalkOptions::all())
            .await
            .map_err(|e| io_err("walking", src, e))?;

        let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.is_dir);
        self.create_dirs(dst, dirs.iter().map(|d| d.rel_path.as_path()))
            .await?;

        for file in files {
            let to = dst.join(&file.rel_path);
            self.fs
                .copy_file(&src.join(&file.rel_path), &to)
                .await
                .map_err(|e| io_err("copying to", &to, e))?;
        }
        Ok(())
    }

    /// Create `root` and each relative directory below it concurrently
    async fn create_dirs<'p>(
        &self,
        root: &Path,
        rel_dirs: impl Iterator<Item = &'p Path>,
    ) -> PersistResult<()> {
        let mut targets = vec![root.to_path_buf()];
        targets.extend(rel_dirs.map(|rel| root.join(rel)));

        try_join_all(targets.iter().map(|dir| async move {
            self.fs
                .create_dir_all(dir)
                .await
                .map_err(|e| io_err("creating", dir, e))
        }))
        .await?;
        Ok(())
    }

    /// Hard-link every file of a directory, creating the directory skeleton first
    async fn link_tree(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        let files = self
            .fs
            .walk(src, WalkOptions::files())
            .await
            .map_err(|e| io_err("walking", src, e))?;
        let dirs = self
            .fs
            .walk(src, WalkOptions::dirs())
            .await
            .map_err(|e| io_err("walking", src, e))?;

        self.create_dirs(dst, dirs.iter().map(|d| d.rel_path.as_path()))
            .await?;

        for file in files {
            self.link_or_copy_file(&src.join(&file.rel_path), &dst.join(&file.rel_path))
                .await?;
        }
        Ok(())
    }

    async fn link_or_copy_file(&mut self, src: &Path, dst: &Path) -> PersistResult<()> {
        self.ensure_parent(dst).await?;

        match self.fs.hard_link(src, dst).await {
            Ok(()) => Ok(()),
            Err(e) if is_recoverable_link_error(&e) => {
                debug!(
                    "Hardlink failed ({}); copying: {} -> {}",
                    e,
                    src.display(),
                    dst.display()
                );
                self.actions.push(Action::LinkFallback {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                    reason: e.to_string(),
                });
                self.fs
                    .copy_file(src, dst)
                    .await
                    .map_err(|e| io_err("copying to", dst, e))?;
                Ok(())
            }
            Err(e) => Err(io_err("hard linking", dst, e)),
        }
    }
}
