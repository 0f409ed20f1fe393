//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$REFMESH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/refmesh/config.toml`
//! 3. `~/.refmesh/config.toml`
//!
//! # Repo Config
//!
//! Located at `<git-dir>/refmesh/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing: remote names and patterns
//! must be usable, and a configured primary must be one of the remotes.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::filter::RefFilter;
use crate::core::types::RemoteName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// dry_run = false
/// prune = true
/// jobs = 4
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Report decisions without pushing or deleting anything
    pub dry_run: Option<bool>,

    /// Execute delete decisions (false reports them only)
    pub prune: Option<bool>,

    /// Worker threads for listing, distance queries and pushes
    pub jobs: Option<usize>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// remotes = ["github", "gitlab", "backup"]
/// primary = "github"
/// branches = ["main", "release-*"]
/// tags = ["v*"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remotes to reconcile, in tie-break order
    pub remotes: Option<Vec<String>>,

    /// Authoritative remote for asymmetric runs
    pub primary: Option<String>,

    /// Branch allow-list (names or globs)
    pub branches: Option<Vec<String>>,

    /// Tag allow-list (names or globs)
    pub tags: Option<Vec<String>>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remotes) = &self.remotes {
            for remote in remotes {
                RemoteName::new(remote.as_str()).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid remote in remotes: {e}"))
                })?;
            }
        }

        if let Some(primary) = &self.primary {
            RemoteName::new(primary.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("invalid primary: {e}")))?;

            if let Some(remotes) = &self.remotes {
                if !remotes.contains(primary) {
                    return Err(ConfigError::InvalidValue(format!(
                        "primary remote '{}' is not part of remotes [{}]",
                        primary,
                        remotes.join(", ")
                    )));
                }
            }
        }

        for patterns in [&self.branches, &self.tags].into_iter().flatten() {
            RefFilter::new(patterns.iter().cloned())
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        Ok(())
    }
}
