//! Directory-backed storage management for Depot.
//!
//! A [`DirectoryStorageManager`] owns a root directory and keeps at most one
//! live handle per entity name, where each entity lives in its own
//! subdirectory. Entity-specific behavior is supplied through
//! [`EntityHooks`]; the manager only enforces naming, uniqueness, lifecycle,
//! and cache teardown.
//!
//! # Design Rules
//!
//! 1. Directory existence is the source of truth for "exists". The in-memory
//!    map only remembers live handles.
//! 2. Creation is reserved in memory before the directory is made, so a
//!    half-created entity is never reported as existing and never handed out.
//! 3. Operations on the same name are serialized; different names proceed
//!    independently.
//! 4. `close()` waits for in-flight operations, closes every live entity,
//!    and only then clears the shared cache.
//! 5. Low-level failures never escape raw: they are mapped into
//!    [`StorageError`] and then into the entity kind's own error type.

pub mod context;
pub mod error;
pub mod hooks;
mod locks;
pub mod manager;
pub mod shutdown;

pub use context::ChildContext;
pub use error::{BoxError, StorageError};
pub use hooks::EntityHooks;
pub use manager::DirectoryStorageManager;
pub use shutdown::ShutdownCause;
