use depot_cache::CacheSpecError;
use depot_storage::{BoxError, ShutdownCause, StorageError};
use depot_types::TypeError;
use thiserror::Error;

/// Errors from project operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project already exists: {0}")]
    Exists(String),

    #[error("project not found: {0}")]
    NotFound(String),

    #[error("project manager is closed")]
    Closed,

    #[error("invalid project name: {0}")]
    InvalidName(#[source] TypeError),

    #[error("invalid cache spec: {0}")]
    InvalidCacheSpec(#[source] CacheSpecError),

    #[error("project storage failure for {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<StorageError> for ProjectError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Exists { name, .. } => Self::Exists(name),
            StorageError::NotFound { name, .. } => Self::NotFound(name),
            StorageError::Closed { .. } => Self::Closed,
            StorageError::InvalidName { source, .. } => Self::InvalidName(source),
            StorageError::Failure { name, source, .. } => Self::Storage { name, source },
            StorageError::InvalidCacheSpec(e) => Self::InvalidCacheSpec(e),
        }
    }
}

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository already exists: {0}")]
    Exists(String),

    #[error("repository not found: {0}")]
    NotFound(String),

    /// The project's repository manager has been closed.
    #[error("repository manager is closed")]
    ManagerClosed,

    /// The repository itself was closed with no work pending.
    #[error("repository {0} is closed")]
    Closed(String),

    /// The repository was closed while writes were pending.
    #[error("repository {name} shut down: {cause}")]
    ShutDown {
        name: String,
        #[source]
        cause: ShutdownCause,
    },

    #[error("invalid repository name: {0}")]
    InvalidName(#[source] TypeError),

    #[error("invalid cache spec: {0}")]
    InvalidCacheSpec(#[source] CacheSpecError),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("repository storage failure for {name}: {source}")]
    Storage {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for RepositoryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Exists { name, .. } => Self::Exists(name),
            StorageError::NotFound { name, .. } => Self::NotFound(name),
            StorageError::Closed { .. } => Self::ManagerClosed,
            StorageError::InvalidName { source, .. } => Self::InvalidName(source),
            StorageError::Failure { name, source, .. } => Self::Storage { name, source },
            StorageError::InvalidCacheSpec(e) => Self::InvalidCacheSpec(e),
        }
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
