use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_cache::CacheStats;
use depot_storage::{DirectoryStorageManager, ShutdownCause};
use depot_types::{Author, CreationTime};
use tokio::runtime::Handle;
use tracing::info;

use crate::config::DepotConfig;
use crate::error::ProjectResult;
use crate::project::{Project, ProjectHooks};

/// Top-level manager of every project under a root directory.
///
/// Owns the repository cache; closing it closes every open project and
/// repository and then clears the cache. The executor is borrowed from the
/// caller and is never shut down here.
pub struct ProjectManager {
    inner: DirectoryStorageManager<ProjectHooks>,
}

impl ProjectManager {
    pub fn new(
        root: impl Into<PathBuf>,
        executor: Handle,
        cache_spec: Option<&str>,
    ) -> ProjectResult<Self> {
        let root = root.into();
        let inner = DirectoryStorageManager::new(&root, ProjectHooks, executor, cache_spec)?;
        info!(root = %root.display(), cache_spec = cache_spec.unwrap_or(""), "project manager ready");
        Ok(Self { inner })
    }

    pub fn from_config(config: &DepotConfig, executor: Handle) -> ProjectResult<Self> {
        Self::new(&config.root_dir, executor, config.cache_spec())
    }

    pub fn get(&self, name: &str) -> ProjectResult<Arc<Project>> {
        self.inner.get(name)
    }

    pub fn create(
        &self,
        name: &str,
        author: &Author,
        creation_time: CreationTime,
    ) -> ProjectResult<Arc<Project>> {
        self.inner.create(name, author, creation_time)
    }

    /// Create a project stamped with the current time.
    pub fn create_now(&self, name: &str, author: &Author) -> ProjectResult<Arc<Project>> {
        self.create(name, author, CreationTime::now())
    }

    pub fn exists(&self, name: &str) -> ProjectResult<bool> {
        self.inner.exists(name)
    }

    pub fn list(&self) -> ProjectResult<Vec<String>> {
        self.inner.list()
    }

    pub fn close(&self, cause: &dyn Fn() -> ShutdownCause) {
        self.inner.close(cause)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn open_count(&self) -> usize {
        self.inner.open_count()
    }

    pub fn root_dir(&self) -> &Path {
        self.inner.root_dir()
    }
}

impl std::fmt::Debug for ProjectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectManager")
            .field("root", &self.root_dir())
            .field("open", &self.open_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
