//! Projects and repositories for Depot.
//!
//! A [`ProjectManager`] keeps one directory per project under its root. Each
//! [`Project`] in turn keeps one directory per [`Repository`] under its
//! `repos/` subdirectory. Both levels are [`DirectoryStorageManager`]s
//! sharing a single context, so every repository reads through the same
//! cache and defers background writes onto the same runtime.
//!
//! ```text
//! <root>/
//!   <project>/
//!     metadata.json
//!     repos/
//!       meta/
//!         metadata.json
//!         content/...
//! ```
//!
//! [`DirectoryStorageManager`]: depot_storage::DirectoryStorageManager

pub mod config;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod project;
pub mod repository;

pub use config::{ConfigError, DepotConfig};
pub use error::{ProjectError, ProjectResult, RepositoryError, RepositoryResult};
pub use manager::ProjectManager;
pub use metadata::{CreationMetadata, MetadataError, METADATA_FILE};
pub use project::{Project, ProjectHooks, INTERNAL_REPOSITORIES};
pub use repository::{Repository, RepositoryHooks, RepositoryManager};
