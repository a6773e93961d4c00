//! Store-backed artifact cache
//!
//! Saves workspace paths into a mounted store directory and restores them
//! into later workspaces.
//!
//! # Store Layout
//!
//! | Scope | Destination |
//! |-------|-------------|
//! | global | `<store>/<owner>__<repo>` |
//! | branch | `<store>/<owner>__<repo>/<ref>` |
//! | run | `<store>/<owner>__<repo>/run-<run id>` |
//!
//! # Restore Strategies
//!
//! - `soft` / `symlink`: workspace entries become links into the store
//! - `hard`: files are hard-linked, falling back to copies across devices

pub mod fs;
pub mod glob;
pub mod guard;
pub mod materialize;
pub mod paths;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use fs::{EntryKind, EntryMeta, LinkKind, LocalFs, StoreFs, WalkEntry, WalkOptions};
pub use glob::{
    join_within, parse_patterns, validate_pattern, validate_patterns, GlobResolver, MatchMode,
    PatternMatches,
};
pub use guard::{ensure_writable, validate_store};
pub use materialize::{Action, Materializer};
pub use paths::{dest_root, sanitize_repository, Scope, StoreRoots};
pub use report::{format_bytes, list_dir, report_dir, summarize, DirSummary, ReportLimits};
