//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RemoteName`] - Name of a configured remote
//! - [`RefName`] - Short branch or tag name (no `refs/heads/` prefix)
//! - [`CommitHash`] - Opaque commit identifier
//! - [`RefKind`] - Branch or tag namespace
//! - [`RemoteSet`] - Ordered, duplicate-free list of remotes
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use refmesh::core::types::{CommitHash, RefKind, RefName, RemoteName};
//!
//! let remote = RemoteName::new("origin").unwrap();
//! let name = RefName::new("release/1.2").unwrap();
//! let hash = CommitHash::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! assert_eq!(RefKind::Branch.full_name(&name), "refs/heads/release/1.2");
//! assert_eq!(hash.short(7), "abc123d");
//! assert_eq!(remote.as_str(), "origin");
//!
//! assert!(RefName::new("invalid..name").is_err());
//! assert!(CommitHash::new("").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid remote name: {0}")]
    InvalidRemoteName(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid commit hash: {0}")]
    InvalidCommitHash(String),

    #[error("invalid remote set: {0}")]
    InvalidRemoteSet(String),
}

/// The name of a configured remote.
///
/// Remote names follow git's remote naming rules loosely: non-empty, no
/// whitespace or control characters, no `:` (it would split a refspec),
/// and no leading `-` (it would read as a flag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteName(String);

impl RemoteName {
    /// Create a new validated remote name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRemoteName` if the name is unusable.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidRemoteName(
                "remote name cannot be empty".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidRemoteName(format!(
                "remote name cannot start with '-': {name}"
            )));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == ':')
        {
            return Err(TypeError::InvalidRemoteName(format!(
                "remote name contains an invalid character: {name}"
            )));
        }
        Ok(Self(name))
    }

    /// Get the remote name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RemoteName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteName> for String {
    fn from(name: RemoteName) -> Self {
        name.0
    }
}

impl AsRef<str> for RemoteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated short ref name, shared by branches and tags.
///
/// Names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.`, `-` or `/`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use refmesh::core::types::RefName;
///
/// let name = RefName::new("feature/my-branch").unwrap();
/// assert_eq!(name.as_str(), "feature/my-branch");
///
/// assert!(RefName::new("").is_err());
/// assert!(RefName::new(".hidden").is_err());
/// assert!(RefName::new("v1^{}").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |reason: &str| Err(TypeError::InvalidRefName(format!("{name:?}: {reason}")));

        if name.is_empty() {
            return invalid("cannot be empty");
        }
        if name == "@" {
            return invalid("'@' is reserved");
        }
        if name.starts_with('-') || name.starts_with('/') {
            return invalid("cannot start with '-' or '/'");
        }
        if name.ends_with('/') || name.ends_with('.') {
            return invalid("cannot end with '/' or '.'");
        }
        for sequence in ["..", "@{", "//"] {
            if name.contains(sequence) {
                return invalid(&format!("cannot contain '{sequence}'"));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return invalid(&format!("cannot contain {c:?}"));
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return invalid("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return invalid("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque commit identifier.
///
/// The engine compares hashes by value and never interprets their
/// structure; only the gateway knows how to resolve them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Create a new commit hash.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitHash` if the value is empty or
    /// contains whitespace.
    pub fn new(hash: impl Into<String>) -> Result<Self, TypeError> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(TypeError::InvalidCommitHash(
                "commit hash cannot be empty".into(),
            ));
        }
        if hash.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidCommitHash(format!(
                "commit hash contains whitespace: {hash:?}"
            )));
        }
        Ok(Self(hash))
    }

    /// Get an abbreviated form of the hash.
    ///
    /// Returns the first `len` characters, or the full hash if shorter.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitHash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for CommitHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ref namespace a reconciliation run works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `refs/heads/*`
    Branch,
    /// `refs/tags/*`
    Tag,
}

impl RefKind {
    /// The full ref prefix for this kind, including the trailing slash.
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Branch => "refs/heads/",
            RefKind::Tag => "refs/tags/",
        }
    }

    /// Short label used in local namespaces and messages.
    pub fn label(self) -> &'static str {
        match self {
            RefKind::Branch => "heads",
            RefKind::Tag => "tags",
        }
    }

    /// Expand a short name into its full ref name.
    pub fn full_name(self, name: &RefName) -> String {
        format!("{}{}", self.prefix(), name.as_str())
    }

    /// Strip this kind's prefix from a full ref name.
    ///
    /// Returns `None` if the ref lives in a different namespace.
    ///
    /// # Example
    ///
    /// ```
    /// use refmesh::core::types::RefKind;
    ///
    /// assert_eq!(RefKind::Tag.strip("refs/tags/v1.0"), Some("v1.0"));
    /// assert_eq!(RefKind::Tag.strip("refs/heads/main"), None);
    /// ```
    pub fn strip(self, full_name: &str) -> Option<&str> {
        full_name
            .strip_prefix(self.prefix())
            .filter(|rest| !rest.is_empty())
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Branch => write!(f, "branch"),
            RefKind::Tag => write!(f, "tag"),
        }
    }
}

/// An ordered, duplicate-free set of remotes with at least two members.
///
/// The order is the caller's order and is used deliberately for every
/// tie-break the engine makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSet(Vec<RemoteName>);

impl RemoteSet {
    /// Build a remote set, preserving the given order.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRemoteSet` for fewer than two remotes or
    /// duplicate names.
    pub fn new(remotes: impl IntoIterator<Item = RemoteName>) -> Result<Self, TypeError> {
        let mut ordered: Vec<RemoteName> = Vec::new();
        for remote in remotes {
            if ordered.contains(&remote) {
                return Err(TypeError::InvalidRemoteSet(format!(
                    "remote '{remote}' is listed more than once"
                )));
            }
            ordered.push(remote);
        }
        if ordered.is_empty() {
            return Err(TypeError::InvalidRemoteSet("no remotes specified".into()));
        }
        if ordered.len() < 2 {
            return Err(TypeError::InvalidRemoteSet(
                "you need to specify at least two remotes".into(),
            ));
        }
        Ok(Self(ordered))
    }

    /// Iterate remotes in caller order.
    pub fn iter(&self) -> std::slice::Iter<'_, RemoteName> {
        self.0.iter()
    }

    /// Number of remotes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a set holds at least two remotes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check membership.
    pub fn contains(&self, remote: &RemoteName) -> bool {
        self.0.contains(remote)
    }

    /// Position of a remote in caller order.
    pub fn position(&self, remote: &RemoteName) -> Option<usize> {
        self.0.iter().position(|r| r == remote)
    }

    /// All remotes except `excluded`, in caller order.
    pub fn without<'a>(&'a self, excluded: &'a RemoteName) -> impl Iterator<Item = &'a RemoteName> {
        self.0.iter().filter(move |r| *r != excluded)
    }

    /// Borrow the remotes as a slice.
    pub fn as_slice(&self) -> &[RemoteName] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RemoteSet {
    type Item = &'a RemoteName;
    type IntoIter = std::slice::Iter<'a, RemoteName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RemoteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(RemoteName::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
