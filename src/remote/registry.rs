//! remote::registry
//!
//! Ordered list of configured remotes.

use crate::core::config::Config;

use super::traits::RemoteError;

/// A named remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.url)
    }
}

/// Registered remotes in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remotes {
    remotes: Vec<Remote>,
}

impl Remotes {
    pub fn new(remotes: Vec<Remote>) -> Self {
        Self { remotes }
    }

    /// Remotes listed in the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .remotes()
                .iter()
                .map(|entry| Remote::new(&entry.name, &entry.url))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Remote> {
        self.remotes.iter().find(|r| r.name == name)
    }

    /// Like [`Remotes::get`], failing with `UnknownRemote`.
    pub fn require(&self, name: &str) -> Result<&Remote, RemoteError> {
        self.get(name)
            .ok_or_else(|| RemoteError::UnknownRemote(name.to_string()))
    }

    /// Remotes to try: just `selected` when given, otherwise all in order.
    pub fn candidates(&self, selected: Option<&str>) -> Result<Vec<&Remote>, RemoteError> {
        match selected {
            Some(name) => Ok(vec![self.require(name)?]),
            None => Ok(self.remotes.iter().collect()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.iter()
    }

    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}
