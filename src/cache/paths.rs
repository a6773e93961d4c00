//! Destination path derivation
//!
//! Maps (scope, store, repository, ref, run id) to the directory a job
//! saves into and restores from. The run-scoped root is always derivable
//! so post-job cleanup has a target that no other run can share.

use crate::error::PersistError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Replacement for path separators in repository identifiers
const SEPARATOR_PLACEHOLDER: &str = "__";

/// Granularity at which cached content is partitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Shared by every run of the repository
    Global,
    /// One subtree per branch or tag name
    Branch,
    /// Exclusive to a single run
    Run,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Branch => "branch",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "branch" => Ok(Self::Branch),
            "run" => Ok(Self::Run),
            _ => Err(PersistError::config(format!(
                "Unknown scope '{s}' (use 'global', 'branch', or 'run')"
            ))),
        }
    }
}

/// Collapse a repository identifier into a single path segment.
///
/// `org/app` becomes `org__app`. Bare `.` and `..` are neutralised so the
/// result can never point at the store itself or its parent.
pub fn sanitize_repository(repository: &str) -> String {
    let safe = repository
        .replace('/', SEPARATOR_PLACEHOLDER)
        .replace('\\', SEPARATOR_PLACEHOLDER);
    match safe.as_str() {
        "" => "_".to_string(),
        "." | ".." => safe.replace('.', "_"),
        _ => safe,
    }
}

/// Resolve the destination root for a scope.
///
/// `global` adds no suffix, `branch` appends the ref name and `run`
/// appends `run-<id>`.
pub fn dest_root(
    scope: Scope,
    store: &Path,
    repository: &str,
    ref_name: &str,
    run_id: &str,
) -> PathBuf {
    let root = store.join(sanitize_repository(repository));
    match scope {
        Scope::Global => root,
        Scope::Branch if ref_name.is_empty() => root,
        Scope::Branch => root.join(ref_name),
        Scope::Run => root.join(format!("run-{run_id}")),
    }
}

/// The pair of roots computed once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRoots {
    /// Destination honouring the active scope
    pub dest_root: PathBuf,
    /// Destination with the scope forced to `run`
    pub run_root: PathBuf,
}

impl StoreRoots {
    pub fn resolve(
        scope: Scope,
        store: &Path,
        repository: &str,
        ref_name: &str,
        run_id: &str,
    ) -> Self {
        Self {
            dest_root: dest_root(scope, store, repository, ref_name, run_id),
            run_root: dest_root(Scope::Run, store, repository, ref_name, run_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Component;

    #[test]
    fn scope_parse() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("Branch".parse::<Scope>().unwrap(), Scope::Branch);
        assert_eq!(" run ".parse::<Scope>().unwrap(), Scope::Run);

        let err = "weekly".parse::<Scope>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Unknown scope 'weekly'"));
    }

    #[test]
    fn sanitize_collapses_separators() {
        assert_eq!(sanitize_repository("org/app"), "org__app");
        assert_eq!(sanitize_repository("a/b/c"), "a__b__c");
        assert_eq!(sanitize_repository("org\\app"), "org__app");
        assert_eq!(sanitize_repository(".."), "__");
        assert_eq!(sanitize_repository("plain"), "plain");
    }

    #[test]
    fn repository_adds_single_segment() {
        let store = Path::new("/store");
        for repo in ["org/app", "deep/nested/name/", "/leading", "..", "../escape"] {
            let root = dest_root(Scope::Global, store, repo, "main", "1");
            let rel = root.strip_prefix(store).unwrap();
            let parts: Vec<_> = rel.components().collect();
            assert_eq!(parts.len(), 1, "{repo} produced {}", root.display());
            assert!(matches!(parts[0], Component::Normal(_)));
        }
    }

    #[test]
    fn scope_suffixes() {
        let store = Path::new("/store");
        assert_eq!(
            dest_root(Scope::Global, store, "org/app", "main", "42"),
            PathBuf::from("/store/org__app")
        );
        assert_eq!(
            dest_root(Scope::Branch, store, "org/app", "main", "42"),
            PathBuf::from("/store/org__app/main")
        );
        assert_eq!(
            dest_root(Scope::Run, store, "org/app", "main", "42"),
            PathBuf::from("/store/org__app/run-42")
        );
    }

    #[test]
    fn dest_root_deterministic() {
        let store = Path::new("/store");
        for scope in [Scope::Global, Scope::Branch, Scope::Run] {
            let a = dest_root(scope, store, "org/app", "feature/x", "7");
            let b = dest_root(scope, store, "org/app", "feature/x", "7");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn run_root_ignores_active_scope() {
        let store = Path::new("/store");
        let forced = dest_root(Scope::Run, store, "org/app", "dev", "99");
        for scope in [Scope::Global, Scope::Branch, Scope::Run] {
            let roots = StoreRoots::resolve(scope, store, "org/app", "dev", "99");
            assert_eq!(roots.run_root, forced);
        }
    }
}
