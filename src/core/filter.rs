//! core::filter
//!
//! Allow-list filtering of branch and tag names.
//!
//! A name is in scope when the allow-list is empty, when it equals one of
//! the patterns exactly, or when it matches one of them as a shell glob
//! (`*`, `?`, `[...]`). As with `fnmatch` without `FNM_PATHNAME`, `*`
//! also matches `/`, so `release-*` accepts `release-1/hotfix`.
//!
//! # Example
//!
//! ```
//! use refmesh::core::filter::{accepts, RefFilter};
//!
//! assert!(accepts("release-1.2", &["release-*"]));
//! assert!(!accepts("main", &["release-*"]));
//! assert!(accepts("main", &[] as &[&str]));
//!
//! let filter = RefFilter::new(["main", "feature/*"]).unwrap();
//! assert!(filter.accepts("feature/login"));
//! assert!(!filter.accepts("develop"));
//! ```

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// Errors from building a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A pattern is not a valid glob.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Check a single name against an allow-list.
///
/// Patterns that fail to compile as globs still match by exact equality.
pub fn accepts<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    if patterns.is_empty() {
        return true;
    }

    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref();
        pattern == name
            || Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(name))
                .unwrap_or(false)
    })
}

/// A compiled allow-list, reused for every name in a run.
#[derive(Debug, Clone)]
pub struct RefFilter {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl RefFilter {
    /// Compile an allow-list.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidPattern` if a pattern is not a valid glob.
    pub fn new<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| FilterError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.kind().to_string(),
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| FilterError::InvalidPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self { patterns, globs })
    }

    /// A filter that accepts everything.
    pub fn accept_all() -> Self {
        Self {
            patterns: Vec::new(),
            globs: GlobSet::empty(),
        }
    }

    /// Check whether a name is in scope.
    pub fn accepts(&self, name: &str) -> bool {
        self.patterns.is_empty()
            || self.patterns.iter().any(|p| p == name)
            || self.globs.is_match(name)
    }

    /// The raw patterns, in the order given.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for RefFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}
