//! Pattern expansion relative to a workspace or store root
//!
//! Patterns are validated before any filesystem access: absolute patterns
//! and patterns with a `..` segment never reach the walker.

use crate::cache::fs::{StoreFs, WalkOptions};
use crate::error::{PersistError, PersistResult};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// What a pattern may match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Files and directories; directories carry a trailing `/`
    Entries,
    /// Regular files only (after following symlinks)
    Files,
}

/// Matches for one input pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatches {
    pub pattern: String,
    pub paths: Vec<String>,
}

impl PatternMatches {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Split the `files` input into patterns.
///
/// One pattern per line; `#` starts a comment; blank lines are dropped.
pub fn parse_patterns(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn looks_like_glob(s: &str) -> bool {
    s.contains('*') || s.contains('{') || s.contains('?') || s.contains('[')
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Reject absolute patterns and patterns that step outside their root
pub fn validate_pattern(pattern: &str) -> PersistResult<()> {
    let absolute = Path::new(pattern).is_absolute()
        || pattern.starts_with('/')
        || pattern.starts_with('\\')
        || has_drive_prefix(pattern);
    // Brace alternatives are split too so `{..,src}` cannot smuggle a parent segment
    let traversal = pattern
        .split(['/', '\\', '{', '}', ','])
        .any(|segment| segment.trim() == "..");

    if absolute || traversal {
        return Err(PersistError::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}

/// Validate every pattern, failing on the first bad one
pub fn validate_patterns(patterns: &[String]) -> PersistResult<()> {
    patterns.iter().try_for_each(|p| validate_pattern(p))
}

/// Join `rel` onto `root`, refusing anything that would leave `root`
pub fn join_within(root: &Path, rel: &str) -> PersistResult<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    let joined = root.join(rel_path);
    if escapes {
        return Err(PersistError::PathEscape(joined));
    }
    Ok(joined)
}

/// Leading directory of a pattern that contains no glob syntax.
///
/// - `src/**/*.ts` -> `src`
/// - `**/*.ts` -> `` (the root)
/// - `foo/bar/*.rs` -> `foo/bar`
fn extract_glob_base(pattern: &str) -> String {
    let mut base_parts = Vec::new();
    for part in pattern.split('/') {
        if looks_like_glob(part) {
            break;
        }
        if !part.is_empty() {
            base_parts.push(part);
        }
    }
    base_parts.join("/")
}

fn compile(pattern: &str) -> PersistResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| PersistError::GlobSyntax {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Expands patterns against one root directory
pub struct GlobResolver<'a> {
    fs: &'a dyn StoreFs,
    root: PathBuf,
}

impl<'a> GlobResolver<'a> {
    pub fn new(fs: &'a dyn StoreFs, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Expand every pattern.
    ///
    /// All patterns are validated up front; one bad pattern aborts the call
    /// before anything is read. Patterns with no matches come back with an
    /// empty path list.
    pub async fn expand(
        &self,
        patterns: &[String],
        mode: MatchMode,
    ) -> PersistResult<Vec<PatternMatches>> {
        validate_patterns(patterns)?;

        let mut results = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let paths = self.expand_one(pattern, mode).await?;
            debug!("Pattern {} matched {} path(s)", pattern, paths.len());
            results.push(PatternMatches {
                pattern: pattern.clone(),
                paths,
            });
        }
        Ok(results)
    }

    async fn expand_one(&self, pattern: &str, mode: MatchMode) -> PersistResult<Vec<String>> {
        let trimmed = pattern.trim().trim_start_matches("./");
        let dirs_only = trimmed.ends_with('/');
        let normalized = trimmed.trim_end_matches('/');
        if normalized.is_empty() || normalized == "." {
            return Ok(vec![]);
        }

        if !looks_like_glob(normalized) {
            return self.expand_literal(normalized, mode, dirs_only).await;
        }

        let matcher = compile(normalized)?;
        let base = extract_glob_base(normalized);
        let max_depth = if normalized.contains("**") {
            None
        } else {
            let base_depth = base.split('/').filter(|p| !p.is_empty()).count();
            Some(normalized.split('/').filter(|p| !p.is_empty()).count() - base_depth)
        };

        let options = match mode {
            MatchMode::Entries => WalkOptions::all(),
            MatchMode::Files => WalkOptions::files(),
        }
        .with_max_depth(max_depth);

        let walk_root = self.root.join(&base);
        trace!("Walking {} for {}", walk_root.display(), normalized);
        let entries = self
            .fs
            .walk(&walk_root, options)
            .await
            .map_err(|e| PersistError::io(format!("walking {}", walk_root.display()), e))?;

        let mut matched = BTreeSet::new();
        for entry in entries {
            if dirs_only && !entry.is_dir {
                continue;
            }
            let rel = to_slash(&Path::new(&base).join(&entry.rel_path));
            if matcher.is_match(&rel) {
                matched.insert(mark(rel, entry.is_dir, mode));
            }
        }
        Ok(matched.into_iter().collect())
    }

    async fn expand_literal(
        &self,
        rel: &str,
        mode: MatchMode,
        dirs_only: bool,
    ) -> PersistResult<Vec<String>> {
        let path = self.root.join(rel);
        let meta = match self.fs.metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(PersistError::io(format!("inspecting {}", path.display()), e));
            }
        };

        let is_dir = meta.is_dir();
        if (dirs_only && !is_dir) || (mode == MatchMode::Files && is_dir) {
            return Ok(vec![]);
        }
        Ok(vec![mark(to_slash(Path::new(rel)), is_dir, mode)])
    }
}

fn mark(rel: String, is_dir: bool, mode: MatchMode) -> String {
    if is_dir && mode == MatchMode::Entries {
        format!("{rel}/")
    } else {
        rel
    }
}
