use std::path::Path;

use depot_types::{Author, CreationTime};

use crate::context::ChildContext;
use crate::error::{BoxError, StorageError};
use crate::shutdown::ShutdownCause;

/// Entity-specific behavior plugged into a
/// [`DirectoryStorageManager`](crate::DirectoryStorageManager).
///
/// Hooks are called with the entity's own directory. The manager guarantees
/// that, for a given name, `open` and `create` never run concurrently and run
/// at most once per successful registration.
pub trait EntityHooks: Send + Sync + 'static {
    /// The live entity handed out by the manager.
    type Entity: Send + Sync + 'static;

    /// The error type callers see. Its `From<StorageError>` impl is the kind's
    /// error factory: one arm per condition (exists, not found, closed,
    /// storage failure).
    type Error: From<StorageError> + std::error::Error + Send + Sync + 'static;

    /// Short noun for the entity kind, used in errors and log fields.
    const KIND: &'static str;

    /// Open an entity whose directory already exists.
    fn open(&self, dir: &Path, ctx: &ChildContext) -> Result<Self::Entity, BoxError>;

    /// Initialize a freshly made, empty directory and return the new entity.
    ///
    /// On error the manager removes the directory.
    fn create(
        &self,
        dir: &Path,
        ctx: &ChildContext,
        author: &Author,
        creation_time: CreationTime,
    ) -> Result<Self::Entity, BoxError>;

    /// Release the entity during manager shutdown.
    ///
    /// `cause` builds the shutdown cause on demand; call it only when the
    /// entity has something to fail with it.
    fn close(&self, dir: &Path, entity: &Self::Entity, cause: &dyn Fn() -> ShutdownCause);
}
