//! recipe
//!
//! Recipes as seen by the resolver.
//!
//! # Modules
//!
//! - [`traits`] - The `Recipe` capability trait and `RecipeLoader`
//! - [`requirement`] - Declared dependencies (pinned or ranged)
//! - [`toml_recipe`] - Declarative `recipe.toml` recipes

pub mod requirement;
pub mod toml_recipe;
pub mod traits;

pub use requirement::{Requirement, RequirementError, RequirementTarget};
pub use toml_recipe::{TomlRecipe, TomlRecipeLoader};
pub use traits::{Recipe, RecipeError, RecipeLoader, ScmCapture};
