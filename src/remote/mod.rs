//! remote
//!
//! Abstraction over remotes holding recipes, sources and binaries.
//!
//! # Architecture
//!
//! The [`RemoteManager`] trait defines the operations the core needs from a
//! transport. Implementations:
//! - [`file::FileRemoteManager`] - directory remotes laid out like the cache
//! - [`mock::MockRemote`] - in-memory, for deterministic tests
//!
//! [`Remotes`] is the ordered registry of configured remotes.
//!
//! # Example
//!
//! ```ignore
//! use stowage::remote::{FileRemoteManager, RemoteManager, Remotes};
//!
//! let remotes = Remotes::from_config(&config);
//! let manager = FileRemoteManager::new();
//! let remote = remotes.require("local")?;
//! let ids = manager.search_packages(&reference, remote).await?;
//! ```

pub mod file;
pub mod mock;
pub mod registry;
pub mod traits;

pub use file::FileRemoteManager;
pub use registry::{Remote, Remotes};
pub use traits::{RecipeQuery, RemoteError, RemoteManager, RetrievedRecipe};
