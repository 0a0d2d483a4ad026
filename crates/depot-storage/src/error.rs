use depot_cache::CacheSpecError;
use depot_types::TypeError;

/// Boxed error returned by entity hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Conditions raised by a [`DirectoryStorageManager`](crate::DirectoryStorageManager).
///
/// The manager never returns this type directly. Each entity kind converts it
/// into its own error type through `From<StorageError>`, which is where
/// kind-specific names such as "project already exists" are chosen.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// `create()` for a name that is already registered or on disk.
    #[error("{kind} already exists: {name}")]
    Exists { kind: &'static str, name: String },

    /// `get()` for a name with no backing directory.
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Any operation after the manager was closed.
    #[error("{kind} storage is closed")]
    Closed { kind: &'static str },

    /// The name cannot be used as an entity directory.
    #[error("invalid {kind} name: {source}")]
    InvalidName {
        kind: &'static str,
        #[source]
        source: TypeError,
    },

    /// A directory operation or entity hook failed.
    #[error("{kind} storage failure for {name}: {source}")]
    Failure {
        kind: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The cache spec supplied at construction could not be parsed.
    #[error("invalid cache spec: {0}")]
    InvalidCacheSpec(#[from] CacheSpecError),
}

impl StorageError {
    pub fn is_exists(&self) -> bool {
        matches!(self, Self::Exists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}
