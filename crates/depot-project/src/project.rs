use std::path::{Path, PathBuf};

use depot_storage::{BoxError, ChildContext, EntityHooks, ShutdownCause};
use depot_types::{Author, CreationTime};
use tracing::debug;

use crate::error::ProjectError;
use crate::metadata::CreationMetadata;
use crate::repository::{entity_name, RepositoryHooks, RepositoryManager};

/// Repositories every new project starts with.
pub const INTERNAL_REPOSITORIES: &[&str] = &["meta"];

const REPOS_DIR: &str = "repos";

/// A named group of repositories.
pub struct Project {
    dir: PathBuf,
    metadata: CreationMetadata,
    repos: RepositoryManager,
}

impl Project {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata(&self) -> &CreationMetadata {
        &self.metadata
    }

    pub fn author(&self) -> &Author {
        &self.metadata.author
    }

    pub fn creation_time(&self) -> CreationTime {
        self.metadata.creation_time
    }

    /// The repositories of this project. Shares the project manager's
    /// cache and executor.
    pub fn repos(&self) -> &RepositoryManager {
        &self.repos
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name())
            .field("dir", &self.dir)
            .field("open_repos", &self.repos.open_count())
            .finish()
    }
}

/// Hooks wiring [`Project`] into a [`DirectoryStorageManager`].
///
/// [`DirectoryStorageManager`]: depot_storage::DirectoryStorageManager
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectHooks;

impl ProjectHooks {
    fn repos(dir: &Path, ctx: &ChildContext) -> Result<RepositoryManager, BoxError> {
        Ok(RepositoryManager::with_context(
            dir.join(REPOS_DIR),
            RepositoryHooks,
            ctx.clone(),
        )?)
    }
}

impl EntityHooks for ProjectHooks {
    type Entity = Project;
    type Error = ProjectError;
    const KIND: &'static str = "project";

    fn open(&self, dir: &Path, ctx: &ChildContext) -> Result<Project, BoxError> {
        let metadata = CreationMetadata::read(dir)?;
        let repos = Self::repos(dir, ctx)?;
        Ok(Project {
            dir: dir.to_path_buf(),
            metadata,
            repos,
        })
    }

    fn create(
        &self,
        dir: &Path,
        ctx: &ChildContext,
        author: &Author,
        creation_time: CreationTime,
    ) -> Result<Project, BoxError> {
        let metadata = CreationMetadata::new(entity_name(dir), author.clone(), creation_time);
        metadata.write(dir)?;

        let repos = Self::repos(dir, ctx)?;
        for name in INTERNAL_REPOSITORIES {
            repos.create(name, author, creation_time)?;
            debug!(project = %metadata.name, repo = *name, "internal repository created");
        }
        Ok(Project {
            dir: dir.to_path_buf(),
            metadata,
            repos,
        })
    }

    fn close(&self, _dir: &Path, project: &Project, cause: &dyn Fn() -> ShutdownCause) {
        project.repos.close(cause);
    }
}
