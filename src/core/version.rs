//! core::version
//!
//! Loose dotted versions with semantic ordering.
//!
//! Recipe versions are free-form (`1`, `2.1`, `1.1.2`, `1.2.11.4`), so this is
//! not strict semver. Ordering rules:
//!
//! - components compare numerically when both are numbers, as text otherwise,
//!   and a number sorts before text
//! - missing trailing components count as zero (`1.1 == 1.1.0`)
//! - a `-prerelease` suffix sorts before the plain release
//!
//! # Example
//!
//! ```
//! use stowage::core::version::Version;
//!
//! let a = Version::parse("1.1.2").unwrap();
//! let b = Version::parse("1.2").unwrap();
//! assert!(a < b);
//! assert_eq!(Version::parse("2.1").unwrap(), Version::parse("2.1.0").unwrap());
//! assert!(Version::parse("1.0-rc1").unwrap() < Version::parse("1.0").unwrap());
//! ```

use std::cmp::Ordering;

use thiserror::Error;

/// Errors from version parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid version '{text}': {reason}")]
pub struct VersionError {
    pub text: String,
    pub reason: String,
}

/// One dotted component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Component {
    Number(u64),
    Text(String),
}

impl Component {
    fn parse(part: &str) -> Self {
        match part.parse::<u64>() {
            Ok(n) => Component::Number(n),
            Err(_) => Component::Text(part.to_string()),
        }
    }

    fn zero() -> Self {
        Component::Number(0)
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Number(a), Component::Number(b)) => a.cmp(b),
            (Component::Number(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Number(_)) => Ordering::Greater,
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed version.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    components: Vec<Component>,
    prerelease: Option<String>,
}

impl Version {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] for empty input or empty components (`1..2`).
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let text = text.trim();
        let err = |reason: &str| VersionError {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(err("version cannot be empty"));
        }

        // Build metadata never affects ordering.
        let without_build = text.split('+').next().unwrap_or(text);
        let (release, prerelease) = match without_build.split_once('-') {
            Some((release, pre)) if !pre.is_empty() => (release, Some(pre.to_string())),
            Some(_) => return Err(err("empty prerelease")),
            None => (without_build, None),
        };

        let mut components = Vec::new();
        for part in release.split('.') {
            if part.is_empty() {
                return Err(err("empty version component"));
            }
            components.push(Component::parse(part));
        }

        Ok(Self {
            text: text.to_string(),
            components,
            prerelease,
        })
    }

    /// Number of dotted components as written.
    pub fn precision(&self) -> usize {
        self.components.len()
    }

    /// Whether this version carries a prerelease tag.
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The original text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The version obtained by incrementing component `index` and dropping
    /// everything after it. Text components reset the bump to zero.
    ///
    /// ```
    /// use stowage::core::version::Version;
    ///
    /// let v = Version::parse("1.1.2").unwrap();
    /// assert_eq!(v.bump(1).as_str(), "1.2");
    /// assert_eq!(v.bump(0).as_str(), "2");
    /// ```
    pub fn bump(&self, index: usize) -> Version {
        let mut components: Vec<Component> = (0..=index)
            .map(|i| self.components.get(i).cloned().unwrap_or_else(Component::zero))
            .collect();
        if let Some(last) = components.last_mut() {
            let bumped = match last {
                Component::Number(n) => Component::Number(n.saturating_add(1)),
                Component::Text(_) => Component::Number(0),
            };
            *last = bumped;
        }
        let text = components
            .iter()
            .map(|c| match c {
                Component::Number(n) => n.to_string(),
                Component::Text(t) => t.clone(),
            })
            .collect::<Vec<_>>()
            .join(".");
        Version {
            text,
            components,
            prerelease: None,
        }
    }

    fn component(&self, index: usize) -> Component {
        self.components
            .get(index)
            .cloned()
            .unwrap_or_else(Component::zero)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("0.1") < v("0.2"));
        assert!(v("0.3") < v("1.1"));
        assert!(v("1.1") < v("1.1.2"));
        assert!(v("1.1.2") < v("1.2.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("2.1") < v("2.2.1"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(v("1"), v("1.0.0"));
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1") < v("1.0.1"));
    }

    #[test]
    fn prerelease_before_release() {
        assert!(v("1.0-alpha") < v("1.0"));
        assert!(v("1.0-alpha") < v("1.0-beta"));
        assert!(v("0.9") < v("1.0-alpha"));
    }

    #[test]
    fn text_components_sort_after_numbers() {
        assert!(v("1.2") < v("1.x"));
        assert!(v("1.a") < v("1.b"));
    }

    #[test]
    fn build_metadata_ignored() {
        assert_eq!(v("1.0+linux"), v("1.0"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.").is_err());
        assert!(Version::parse("1.0-").is_err());
    }

    #[test]
    fn bump_truncates() {
        assert_eq!(v("1.1").bump(1), v("1.2"));
        assert_eq!(v("0").bump(0), v("1"));
        assert_eq!(v("2").bump(1), v("2.1"));
        assert_eq!(v("1.1.2").bump(2), v("1.1.3"));
    }

    #[test]
    fn precision_counts_written_components() {
        assert_eq!(v("1").precision(), 1);
        assert_eq!(v("1.2.3").precision(), 3);
    }
}
