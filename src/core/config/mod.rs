//! core::config
//!
//! Configuration schema and loading.
//!
//! # Home Directory
//!
//! Resolved in order:
//! 1. An explicit path (the `--home` CLI flag)
//! 2. `$STOW_HOME` if set
//! 3. `~/.stow`
//!
//! The configuration lives at `<home>/config.toml`. A missing file is not an
//! error; defaults are used.
//!
//! # Precedence
//!
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use stowage::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("Storage: {}", config.storage_path().display());
//! for remote in config.remotes() {
//!     println!("{} -> {}", remote.name, remote.url);
//! }
//! ```

pub mod schema;

pub use schema::{RemoteEntry, StowConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the stow home directory.
pub const HOME_ENV: &str = "STOW_HOME";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration plus the home directory it belongs to.
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed file content (defaults when the file is missing)
    pub file: StowConfig,
    home: PathBuf,
}

impl Config {
    /// Resolve the home directory and load `<home>/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation.
    pub fn load(home: Option<&Path>) -> Result<Self, ConfigError> {
        let home = match home {
            Some(path) => path.to_path_buf(),
            None => Self::default_home()?,
        };
        Self::load_from_home(home)
    }

    /// Load from an already resolved home directory.
    pub fn load_from_home(home: PathBuf) -> Result<Self, ConfigError> {
        let path = home.join("config.toml");
        let file = if path.exists() {
            Self::read_config(&path)?
        } else {
            StowConfig::default()
        };
        file.validate()?;
        Ok(Self { file, home })
    }

    /// Build a configuration in memory (tests, embedding).
    pub fn with_file(home: PathBuf, file: StowConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, home })
    }

    /// `$STOW_HOME`, or `~/.stow`.
    pub fn default_home() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(HOME_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".stow"))
    }

    fn read_config(path: &Path) -> Result<StowConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Validate and write the configuration atomically.
    ///
    /// Creates the home directory if needed. Writes to a temp file first,
    /// then renames it over the old file.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        self.file.validate()?;
        let path = self.config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.clone(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(&self.file)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, &path).map_err(|e| ConfigError::WriteError {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// The stow home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Root of the package cache.
    ///
    /// Defaults to `<home>/data`.
    pub fn storage_path(&self) -> PathBuf {
        self.file
            .storage_path
            .clone()
            .unwrap_or_else(|| self.home.join("data"))
    }

    /// Whether short-path redirection is enabled.
    ///
    /// Defaults to `true` on Windows only.
    pub fn short_paths_enabled(&self) -> bool {
        self.file.short_paths.unwrap_or(cfg!(windows))
    }

    /// Storage root for redirected folders.
    ///
    /// Defaults to `<home>/short`.
    pub fn short_paths_root(&self) -> PathBuf {
        self.file
            .short_paths_root
            .clone()
            .unwrap_or_else(|| self.home.join("short"))
    }

    /// Configured remotes in priority order.
    pub fn remotes(&self) -> &[RemoteEntry] {
        &self.file.remotes
    }

    /// Remote used when a command does not name one.
    ///
    /// Defaults to the first configured remote.
    pub fn default_remote(&self) -> Option<&str> {
        self.file
            .default_remote
            .as_deref()
            .or_else(|| self.file.remotes.first().map(|r| r.name.as_str()))
    }

    // =========================================================================
    // Remote editing
    // =========================================================================

    /// Append a remote.
    pub fn add_remote(&mut self, name: &str, url: &str) -> Result<(), ConfigError> {
        if self.file.remotes.iter().any(|r| r.name == name) {
            return Err(ConfigError::InvalidValue(format!(
                "remote '{}' already exists",
                name
            )));
        }
        self.file.remotes.push(RemoteEntry {
            name: name.to_string(),
            url: url.to_string(),
        });
        self.file.validate()
    }

    /// Remove a remote, clearing the default if it pointed at it.
    pub fn remove_remote(&mut self, name: &str) -> Result<(), ConfigError> {
        let before = self.file.remotes.len();
        self.file.remotes.retain(|r| r.name != name);
        if self.file.remotes.len() == before {
            return Err(ConfigError::InvalidValue(format!(
                "remote '{}' not found",
                name
            )));
        }
        if self.file.default_remote.as_deref() == Some(name) {
            self.file.default_remote = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(temp.path())).unwrap();
        assert_eq!(config.storage_path(), temp.path().join("data"));
        assert_eq!(config.short_paths_root(), temp.path().join("short"));
        assert_eq!(config.short_paths_enabled(), cfg!(windows));
        assert!(config.remotes().is_empty());
        assert_eq!(config.default_remote(), None);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::load(Some(temp.path())).unwrap();
        config.add_remote("local", "/srv/remote").unwrap();
        config.add_remote("mirror", "/srv/mirror").unwrap();
        let path = config.save().unwrap();
        assert_eq!(path, temp.path().join("config.toml"));
        assert!(!temp.path().join("config.toml.tmp").exists());

        let loaded = Config::load(Some(temp.path())).unwrap();
        assert_eq!(loaded.remotes().len(), 2);
        assert_eq!(loaded.default_remote(), Some("local"));
    }

    #[test]
    fn add_duplicate_remote_fails() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::load(Some(temp.path())).unwrap();
        config.add_remote("local", "/a").unwrap();
        assert!(config.add_remote("local", "/b").is_err());
    }

    #[test]
    fn remove_remote_clears_default() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::with_file(
            temp.path().to_path_buf(),
            StowConfig {
                default_remote: Some("local".into()),
                remotes: vec![RemoteEntry {
                    name: "local".into(),
                    url: "/a".into(),
                }],
                ..Default::default()
            },
        )
        .unwrap();

        config.remove_remote("local").unwrap();
        assert!(config.remotes().is_empty());
        assert_eq!(config.file.default_remote, None);
        assert!(config.remove_remote("local").is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.toml"), "remotes = 3").unwrap();
        assert!(matches!(
            Config::load(Some(temp.path())),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
