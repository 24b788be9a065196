//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! `<home>/config.toml`, where `<home>` is `$STOW_HOME` or `~/.stow`.
//!
//! # Validation
//!
//! Config values are validated after parsing: remote names must be
//! non-empty and unique, and the default remote must be one of them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Stow configuration.
///
/// # Example
///
/// ```toml
/// storage_path = "/var/cache/stow/data"
/// short_paths = true
/// short_paths_root = "C:/.stow"
/// default_remote = "local"
///
/// [[remotes]]
/// name = "local"
/// url = "/srv/stow-remote"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StowConfig {
    /// Root of the package cache (default: `<home>/data`)
    pub storage_path: Option<PathBuf>,

    /// Redirect deep folders of short-path recipes (default: Windows only)
    pub short_paths: Option<bool>,

    /// Storage root for redirected folders (default: `<home>/short`)
    pub short_paths_root: Option<PathBuf>,

    /// Remote used when a command does not name one
    pub default_remote: Option<String>,

    /// Ordered list of remotes
    pub remotes: Vec<RemoteEntry>,
}

/// One configured remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteEntry {
    /// Unique remote name
    pub name: String,

    /// Location understood by the remote manager
    pub url: String,
}

impl StowConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for remote in &self.remotes {
            if remote.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote name cannot be empty".into(),
                ));
            }
            if remote.url.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "remote '{}' has an empty url",
                    remote.name
                )));
            }
            if !seen.insert(remote.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "remote '{}' is defined more than once",
                    remote.name
                )));
            }
        }

        if let Some(default) = &self.default_remote {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "default remote '{}' is not a configured remote",
                    default
                )));
            }
        }

        Ok(())
    }
}
