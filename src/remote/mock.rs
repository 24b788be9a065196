//! remote::mock
//!
//! Mock remote manager for deterministic testing.
//!
//! # Design
//!
//! The mock keeps recipes, sources and binaries in memory, keyed by remote
//! name. Every call is recorded so tests can assert exactly which remote
//! round-trips happened, and a single operation can be configured to fail.
//!
//! # Example
//!
//! ```
//! use stowage::core::reference::Reference;
//! use stowage::remote::mock::{MockOperation, MockRemote};
//! use stowage::remote::{RecipeQuery, Remote, RemoteManager};
//!
//! # tokio_test::block_on(async {
//! let mock = MockRemote::new();
//! let say = Reference::parse("say/0.1@myuser/testing").unwrap();
//! mock.add_recipe("local", &say, "[recipe]\n");
//!
//! let found = mock
//!     .search_recipes(&RecipeQuery::named("say"), &Remote::new("local", "mock://"))
//!     .await
//!     .unwrap();
//! assert_eq!(found, vec![say]);
//! assert!(matches!(mock.operations()[0], MockOperation::SearchRecipes { .. }));
//! # });
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::registry::Remote;
use super::traits::{RecipeQuery, RemoteError, RemoteManager, RetrievedRecipe};
use crate::core::manifest::FileManifest;
use crate::core::paths::RECIPE_FILE;
use crate::core::pattern::ReferencePattern;
use crate::core::reference::{PackageReference, Reference};

/// Mock remote manager for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    /// (remote name, unrevisioned reference text) -> entry
    entries: BTreeMap<(String, String), MockEntry>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

type Files = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct MockEntry {
    reference: Reference,
    recipe: Files,
    sources: Option<Files>,
    packages: BTreeMap<String, Files>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRecipe(RemoteError),
    GetRecipeSources(RemoteError),
    SearchRecipes(RemoteError),
    SearchPackages(RemoteError),
    GetPackage(RemoteError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRecipe { reference: String, remote: String },
    GetRecipeSources { reference: String, remote: String },
    SearchRecipes { name: String, remote: String },
    SearchPattern { pattern: String, remote: String },
    SearchPackages { reference: String, remote: String },
    GetPackage { package: String, remote: String },
}

fn revision_of(files: &Files) -> String {
    let mut manifest = FileManifest::default();
    for (path, content) in files {
        manifest.insert(path.clone(), content.as_bytes());
    }
    manifest.revision()
}

fn write_files(dest: &Path, files: &Files) -> Result<Vec<String>, RemoteError> {
    for (relative, content) in files {
        let path = dest.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RemoteError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| RemoteError::io(&path, e))?;
    }
    Ok(files.keys().cloned().collect())
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a recipe whose `recipe.toml` holds `recipe_toml`.
    pub fn add_recipe(&self, remote: &str, reference: &Reference, recipe_toml: &str) -> &Self {
        let key = (remote.to_string(), reference.to_string());
        let mut inner = self.lock();
        let entry = inner.entries.entry(key).or_insert_with(|| MockEntry {
            reference: reference.without_revision(),
            recipe: Files::new(),
            sources: None,
            packages: BTreeMap::new(),
        });
        entry
            .recipe
            .insert(RECIPE_FILE.to_string(), recipe_toml.to_string());
        self
    }

    /// Publish bundled sources for an already published recipe.
    pub fn add_sources(&self, remote: &str, reference: &Reference, files: &[(&str, &str)]) -> &Self {
        let key = (remote.to_string(), reference.to_string());
        if let Some(entry) = self.lock().entries.get_mut(&key) {
            let sources = entry.sources.get_or_insert_with(Files::new);
            for (path, content) in files {
                sources.insert(path.to_string(), content.to_string());
            }
        }
        self
    }

    /// Publish a binary for an already published recipe.
    pub fn add_package(
        &self,
        remote: &str,
        reference: &Reference,
        package_id: &str,
        files: &[(&str, &str)],
    ) -> &Self {
        let key = (remote.to_string(), reference.to_string());
        if let Some(entry) = self.lock().entries.get_mut(&key) {
            let package = entry.packages.entry(package_id.to_string()).or_default();
            for (path, content) in files {
                package.insert(path.to_string(), content.to_string());
            }
        }
        self
    }

    /// Revision the mock reports for a published recipe.
    pub fn recipe_revision(&self, remote: &str, reference: &Reference) -> Option<String> {
        let key = (remote.to_string(), reference.to_string());
        self.lock().entries.get(&key).map(|e| revision_of(&e.recipe))
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    fn record(&self, op: MockOperation) {
        self.lock().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), RemoteError> {
        let inner = self.lock();
        match &inner.fail_on {
            Some(FailOn::GetRecipe(e)) if expected == "get_recipe" => Err(e.clone()),
            Some(FailOn::GetRecipeSources(e)) if expected == "get_recipe_sources" => Err(e.clone()),
            Some(FailOn::SearchRecipes(e)) if expected == "search_recipes" => Err(e.clone()),
            Some(FailOn::SearchPackages(e)) if expected == "search_packages" => Err(e.clone()),
            Some(FailOn::GetPackage(e)) if expected == "get_package" => Err(e.clone()),
            _ => Ok(()),
        }
    }

    fn entry(&self, remote: &Remote, reference: &Reference) -> Result<MockEntry, RemoteError> {
        let key = (remote.name.clone(), reference.to_string());
        let entry = self
            .lock()
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| {
                RemoteError::NotFound(format!("recipe {} in remote '{}'", reference, remote.name))
            })?;
        if let Some(pinned) = reference.revision() {
            if pinned != revision_of(&entry.recipe) {
                return Err(RemoteError::NotFound(format!(
                    "recipe {} in remote '{}'",
                    reference.full_text(),
                    remote.name
                )));
            }
        }
        Ok(entry)
    }
}

#[async_trait]
impl RemoteManager for MockRemote {
    async fn get_recipe(
        &self,
        reference: &Reference,
        remote: &Remote,
        export_dir: &Path,
    ) -> Result<RetrievedRecipe, RemoteError> {
        self.record(MockOperation::GetRecipe {
            reference: reference.full_text(),
            remote: remote.name.clone(),
        });
        self.check_fail("get_recipe")?;

        let entry = self.entry(remote, reference)?;
        let files = write_files(export_dir, &entry.recipe)?;
        Ok(RetrievedRecipe {
            reference: entry.reference.with_revision(revision_of(&entry.recipe)),
            files,
        })
    }

    async fn get_recipe_sources(
        &self,
        reference: &Reference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<(), RemoteError> {
        self.record(MockOperation::GetRecipeSources {
            reference: reference.full_text(),
            remote: remote.name.clone(),
        });
        self.check_fail("get_recipe_sources")?;

        let entry = self.entry(remote, reference)?;
        let sources = entry.sources.ok_or_else(|| {
            RemoteError::NotFound(format!("sources of {} in remote '{}'", reference, remote.name))
        })?;
        write_files(dest, &sources)?;
        Ok(())
    }

    async fn search_recipes(
        &self,
        query: &RecipeQuery,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError> {
        self.record(MockOperation::SearchRecipes {
            name: query.name.clone(),
            remote: remote.name.clone(),
        });
        self.check_fail("search_recipes")?;

        let inner = self.lock();
        let mut found: Vec<Reference> = inner
            .entries
            .iter()
            .filter(|((name, _), entry)| *name == remote.name && query.matches(&entry.reference))
            .map(|(_, entry)| entry.reference.clone())
            .collect();
        found.sort();
        Ok(found)
    }

    async fn search_pattern(
        &self,
        pattern: &ReferencePattern,
        remote: &Remote,
    ) -> Result<Vec<Reference>, RemoteError> {
        self.record(MockOperation::SearchPattern {
            pattern: pattern.as_str().to_string(),
            remote: remote.name.clone(),
        });
        self.check_fail("search_recipes")?;

        let inner = self.lock();
        let mut found: Vec<Reference> = inner
            .entries
            .iter()
            .filter(|((name, _), entry)| *name == remote.name && pattern.matches(&entry.reference))
            .map(|(_, entry)| entry.reference.clone())
            .collect();
        found.sort();
        Ok(found)
    }

    async fn search_packages(
        &self,
        reference: &Reference,
        remote: &Remote,
    ) -> Result<Vec<String>, RemoteError> {
        self.record(MockOperation::SearchPackages {
            reference: reference.full_text(),
            remote: remote.name.clone(),
        });
        self.check_fail("search_packages")?;

        let entry = self.entry(remote, reference)?;
        Ok(entry.packages.keys().cloned().collect())
    }

    async fn get_package(
        &self,
        package: &PackageReference,
        remote: &Remote,
        dest: &Path,
    ) -> Result<PackageReference, RemoteError> {
        self.record(MockOperation::GetPackage {
            package: package.full_text(),
            remote: remote.name.clone(),
        });
        self.check_fail("get_package")?;

        let entry = self.entry(remote, package.reference())?;
        let files = entry.packages.get(package.package_id()).ok_or_else(|| {
            RemoteError::NotFound(format!("package {} in remote '{}'", package, remote.name))
        })?;
        write_files(dest, files)?;
        Ok(package.with_revision(revision_of(files)))
    }
}
