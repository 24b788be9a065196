//! recipe::toml_recipe
//!
//! Declarative `recipe.toml` recipes.
//!
//! # Format
//!
//! ```toml
//! [recipe]
//! name = "hello"
//! version = "1.2"
//! short_paths = false
//! exports = ["LICENSE"]
//! exports_sources = ["src/*"]
//! requires = [
//!   "say/[>0.1,<1]@myuser/testing",
//!   { reference = "zlib/1.2.11@conan/stable", override = true },
//!   { reference = "fmt/[~6.1]@conan/stable", private = true },
//! ]
//!
//! [scm]
//! capture_origin = false
//! capture_revision = false
//! ```
//!
//! Requirements are validated when the recipe is loaded, so a recipe that
//! loads always yields well-formed requirements.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::requirement::{Requirement, RequirementError};
use super::traits::{Recipe, RecipeError, RecipeLoader, ScmCapture};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeFile {
    #[serde(default)]
    recipe: RecipeSection,
    #[serde(default)]
    scm: ScmSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RecipeSection {
    name: Option<String>,
    version: Option<String>,
    short_paths: bool,
    exports: Vec<String>,
    exports_sources: Vec<String>,
    requires: Vec<RequireEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RequireEntry {
    Text(String),
    Table {
        reference: String,
        #[serde(default, rename = "override")]
        overriding: bool,
        #[serde(default)]
        private: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ScmSection {
    capture_origin: bool,
    capture_revision: bool,
}

/// A recipe read from `recipe.toml`.
#[derive(Debug, Clone, Default)]
pub struct TomlRecipe {
    name: Option<String>,
    version: Option<String>,
    short_paths: bool,
    exports: Vec<String>,
    exports_sources: Vec<String>,
    requires: Vec<Requirement>,
    scm: ScmCapture,
}

impl TomlRecipe {
    /// Parse recipe text. `path` is only used for error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, RecipeError> {
        let file: RecipeFile = toml::from_str(text).map_err(|e| RecipeError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let requires = file
            .recipe
            .requires
            .iter()
            .map(|entry| -> Result<Requirement, RequirementError> {
                let requirement = match entry {
                    RequireEntry::Text(text) => Requirement::parse(text)?,
                    RequireEntry::Table {
                        reference,
                        overriding,
                        private,
                    } => Requirement::parse(reference)?
                        .with_override(*overriding)
                        .with_private(*private),
                };
                Ok(requirement)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RecipeError::Requirement {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            name: file.recipe.name,
            version: file.recipe.version,
            short_paths: file.recipe.short_paths,
            exports: file.recipe.exports,
            exports_sources: file.recipe.exports_sources,
            requires,
            scm: ScmCapture {
                capture_origin: file.scm.capture_origin,
                capture_revision: file.scm.capture_revision,
            },
        })
    }

    /// Name declared in the recipe, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Version declared in the recipe, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl Recipe for TomlRecipe {
    fn requirements(&self) -> Vec<Requirement> {
        self.requires.clone()
    }

    fn uses_short_paths(&self) -> bool {
        self.short_paths
    }

    fn scm(&self) -> ScmCapture {
        self.scm
    }

    fn exports(&self) -> Vec<String> {
        self.exports.clone()
    }

    fn exports_sources(&self) -> Vec<String> {
        self.exports_sources.clone()
    }
}

/// Loader for `recipe.toml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlRecipeLoader;

impl TomlRecipeLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load with the concrete type, for callers that need the declared
    /// name and version.
    pub fn load_toml(&self, path: &Path) -> Result<TomlRecipe, RecipeError> {
        let text = fs::read_to_string(path).map_err(|e| RecipeError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        TomlRecipe::parse(&text, path)
    }
}

impl RecipeLoader for TomlRecipeLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Recipe>, RecipeError> {
        Ok(Arc::new(self.load_toml(path)?))
    }
}
