// src/dag/filter.rs

//! Path predicates deciding which propagated files a node accepts.

use std::fmt;
use std::sync::Arc;

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::errors::{DagError, Result};

type PathPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A single polymorphic path predicate.
///
/// Globs follow shell `fnmatch` rules: `*` also matches `/`, so `"*fasta"`
/// accepts `"/b/file.fasta"`.
#[derive(Clone, Default)]
pub enum FileFilter {
    /// Accept every path.
    #[default]
    Any,
    Glob {
        pattern: String,
        matcher: GlobMatcher,
    },
    GlobSet {
        patterns: Vec<String>,
        set: GlobSet,
    },
    Predicate {
        label: String,
        predicate: PathPredicate,
    },
}

impl FileFilter {
    pub fn glob(pattern: &str) -> Result<Self> {
        let matcher = compile_glob(pattern)?.compile_matcher();
        Ok(FileFilter::Glob {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn globs<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pat in &patterns {
            builder.add(compile_glob(pat)?);
        }
        let set = builder.build().map_err(|e| {
            DagError::Configuration(format!("building file filter glob set: {e}"))
        })?;

        Ok(FileFilter::GlobSet { patterns, set })
    }

    pub fn predicate<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        FileFilter::Predicate {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn accepts(&self, path: &str) -> bool {
        match self {
            FileFilter::Any => true,
            FileFilter::Glob { matcher, .. } => matcher.is_match(path),
            FileFilter::GlobSet { set, .. } => set.is_match(path),
            FileFilter::Predicate { predicate, .. } => predicate(path),
        }
    }

    /// Human-readable description stored in snapshots; `None` for `Any`.
    pub fn label(&self) -> Option<String> {
        match self {
            FileFilter::Any => None,
            FileFilter::Glob { pattern, .. } => Some(pattern.clone()),
            FileFilter::GlobSet { patterns, .. } => Some(format!("{patterns:?}")),
            FileFilter::Predicate { label, .. } => Some(label.clone()),
        }
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "FileFilter({label})"),
            None => f.write_str("FileFilter(*)"),
        }
    }
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    Glob::new(pattern).map_err(|e| {
        DagError::Configuration(format!("invalid file filter glob {pattern:?}: {e}"))
    })
}
