//! Read-only directory summaries for operator diagnostics
//!
//! Used right before destructive cleanup so the job log shows what is about
//! to disappear. Nothing here influences control flow.

use crate::cache::fs::{EntryKind, StoreFs};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Maximum names printed by [`list_dir`]
const LIST_DIR_LIMIT: usize = 50;

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Traversal bounds for [`summarize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLimits {
    /// Sample lines kept
    pub max_entries: usize,
    /// Deepest directory level descended into
    pub max_depth: usize,
}

impl ReportLimits {
    /// Limits matching the requested log detail
    pub fn for_detail(verbose: bool, trace: bool) -> Self {
        if trace {
            Self {
                max_entries: 1000,
                max_depth: 10,
            }
        } else if verbose {
            Self {
                max_entries: 300,
                max_depth: 5,
            }
        } else {
            Self::default()
        }
    }
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_entries: 120,
            max_depth: 3,
        }
    }
}

/// Result of a bounded traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirSummary {
    pub files: u64,
    pub dirs: u64,
    pub links: u64,
    /// Sum of regular file sizes
    pub bytes: u64,
    /// First discovered entries, one formatted line each
    pub sample: Vec<String>,
}

impl DirSummary {
    pub fn total(&self) -> u64 {
        self.files + self.dirs + self.links
    }
}

/// Depth-first summary of `root`, or `None` when it does not exist.
///
/// Uses an explicit stack so deep trees cannot exhaust the call stack.
/// Unreadable directories and entries are skipped.
pub async fn summarize(fs: &dyn StoreFs, root: &Path, limits: ReportLimits) -> Option<DirSummary> {
    if !fs.exists(root).await.unwrap_or(false) {
        return None;
    }

    let mut summary = DirSummary::default();
    let mut stack: Vec<(PathBuf, usize, PathBuf)> = vec![(root.to_path_buf(), 0, PathBuf::new())];

    while let Some((dir, depth, rel)) = stack.pop() {
        let Ok(names) = fs.read_dir(&dir).await else {
            continue;
        };
        for name in names {
            let full = dir.join(&name);
            let rel_path = rel.join(&name);
            let Ok(meta) = fs.symlink_metadata(&full).await else {
                continue;
            };

            let line = match meta.kind {
                EntryKind::Dir => {
                    summary.dirs += 1;
                    if depth < limits.max_depth {
                        stack.push((full, depth + 1, rel_path.clone()));
                    }
                    format!("D  {}/", rel_path.display())
                }
                EntryKind::Symlink => {
                    summary.links += 1;
                    format!("L  {} -> (symlink)", rel_path.display())
                }
                EntryKind::File => {
                    summary.files += 1;
                    summary.bytes += meta.len;
                    format!("F  {}  ({})", rel_path.display(), format_bytes(meta.len))
                }
            };
            if summary.sample.len() < limits.max_entries {
                summary.sample.push(line);
            }
        }
    }

    Some(summary)
}

/// Log a sanity report for `root` ahead of cleanup
pub async fn report_dir(fs: &dyn StoreFs, label: &str, root: &Path, verbose: bool, trace: bool) {
    if root.as_os_str().is_empty() {
        info!("{}: <empty path>", label);
        return;
    }

    let Some(summary) = summarize(fs, root, ReportLimits::for_detail(verbose, trace)).await else {
        info!("{}: path does not exist -> {}", label, root.display());
        return;
    };

    info!("sanity report for {} ({})", label, root.display());
    info!(
        "entries: files={}, dirs={}, links={}, total={}",
        summary.files,
        summary.dirs,
        summary.links,
        summary.total()
    );
    info!("approx size: {}", format_bytes(summary.bytes));

    if summary.sample.is_empty() {
        info!("<empty>");
        return;
    }

    if trace {
        info!("sample (first {}):", summary.sample.len());
    } else {
        info!(
            "sample (first {}, increase with 'trace: true'):",
            summary.sample.len()
        );
    }
    for line in &summary.sample {
        info!("{}", line);
    }
    if !trace {
        info!("(enable 'trace: true' for deeper/longer listing)");
    }
}

/// Log a short listing of a freshly written destination
pub async fn list_dir(fs: &dyn StoreFs, path: &Path) {
    let meta = match fs.symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(_) => {
            info!("path: {} (missing)", path.display());
            return;
        }
    };

    if !meta.is_dir() {
        info!("path: {} (file) size={}", path.display(), meta.len);
        return;
    }

    let names = fs.read_dir(path).await.unwrap_or_default();
    info!("path: {}", path.display());
    info!("entries: {}", names.len());
    for name in names.iter().take(LIST_DIR_LIMIT) {
        info!(" - {}", name.to_string_lossy());
    }
}
