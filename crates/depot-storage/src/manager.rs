use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use depot_cache::{CacheSpec, CacheStats, RepositoryCache};
use depot_types::{validate_entity_name, Author, CreationTime};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::context::ChildContext;
use crate::error::{BoxError, StorageError};
use crate::hooks::EntityHooks;
use crate::locks::NameLocks;
use crate::shutdown::ShutdownCause;

/// Live handles plus the names currently being created.
struct Registry<E> {
    /// Set as soon as `close` starts, before it waits for in-flight calls.
    closing: bool,
    closed: bool,
    children: HashMap<String, Arc<E>>,
    creating: HashSet<String>,
}

impl<E> Registry<E> {
    fn rejects_calls(&self) -> bool {
        self.closing || self.closed
    }
}

/// Registry of named entities, one subdirectory each, under a root directory.
///
/// Entities are opened lazily on the first `get()` of an existing directory,
/// or registered by a successful `create()`. Each name has at most one live
/// handle, shared by every caller as an `Arc`. Handles are released only by
/// [`close`](Self::close), which also tears down the shared cache.
///
/// Lock order: `lifecycle`, then the per-name lock, then `registry`.
/// `get`/`create` hold `lifecycle` for reading across their slow path, and
/// `close` takes it for writing, so close waits for in-flight operations and
/// none can start after it.
pub struct DirectoryStorageManager<H: EntityHooks> {
    root: PathBuf,
    hooks: H,
    ctx: ChildContext,
    owns_cache: bool,
    registry: RwLock<Registry<H::Entity>>,
    name_locks: NameLocks,
    lifecycle: RwLock<()>,
}

impl<H: EntityHooks> DirectoryStorageManager<H> {
    /// Create a top-level manager.
    ///
    /// A cache is built when `cache_spec` is present and non-blank; this
    /// manager then clears it on close. The executor stays owned by the
    /// caller.
    pub fn new(
        root: impl Into<PathBuf>,
        hooks: H,
        executor: Handle,
        cache_spec: Option<&str>,
    ) -> Result<Self, H::Error> {
        let cache = CacheSpec::parse_optional(cache_spec)
            .map_err(StorageError::from)?
            .map(|spec| Arc::new(RepositoryCache::new(spec)));
        Self::build(root.into(), hooks, ChildContext::new(executor, cache), true)
    }

    /// Create a manager that reuses a parent's context.
    ///
    /// Used for nested kinds (a project's repositories). The shared cache is
    /// left for the parent manager to clear.
    pub fn with_context(
        root: impl Into<PathBuf>,
        hooks: H,
        ctx: ChildContext,
    ) -> Result<Self, H::Error> {
        Self::build(root.into(), hooks, ctx, false)
    }

    fn build(root: PathBuf, hooks: H, ctx: ChildContext, owns_cache: bool) -> Result<Self, H::Error> {
        fs::create_dir_all(&root).map_err(|e| StorageError::Failure {
            kind: H::KIND,
            name: root.display().to_string(),
            source: Box::new(e),
        })?;
        debug!(kind = H::KIND, root = %root.display(), caching = ctx.cache().is_some(), "storage manager started");

        Ok(Self {
            root,
            hooks,
            ctx,
            owns_cache,
            registry: RwLock::new(Registry {
                closing: false,
                closed: false,
                children: HashMap::new(),
                creating: HashSet::new(),
            }),
            name_locks: NameLocks::default(),
            lifecycle: RwLock::new(()),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> &ChildContext {
        &self.ctx
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Return the live entity for `name`, opening it if its directory exists.
    ///
    /// Fails with `NotFound` when the directory is absent or the entity is
    /// still being created.
    pub fn get(&self, name: &str) -> Result<Arc<H::Entity>, H::Error> {
        self.validate(name)?;
        {
            let registry = self.read_registry();
            if registry.rejects_calls() {
                return Err(self.closed_error().into());
            }
            if let Some(child) = registry.children.get(name) {
                return Ok(Arc::clone(child));
            }
            if registry.creating.contains(name) {
                return Err(self.not_found_error(name).into());
            }
        }

        let dir = self.child_dir(name);
        if !dir.is_dir() {
            return Err(self.not_found_error(name).into());
        }

        let _lifecycle = self.lifecycle.read().expect("lifecycle lock poisoned");
        let _name = self.name_locks.lock(name);
        {
            let registry = self.read_registry();
            if registry.rejects_calls() {
                return Err(self.closed_error().into());
            }
            if let Some(child) = registry.children.get(name) {
                return Ok(Arc::clone(child));
            }
        }
        // Re-check under the name lock: a side channel may have removed it.
        if !dir.is_dir() {
            return Err(self.not_found_error(name).into());
        }

        let child = self
            .hooks
            .open(&dir, &self.ctx)
            .map_err(|source| self.failure(name, source))?;
        let child = Arc::new(child);
        self.write_registry()
            .children
            .insert(name.to_string(), Arc::clone(&child));
        debug!(kind = H::KIND, name, "opened");
        Ok(child)
    }

    /// Create a new entity, attributing it to `author` at `creation_time`.
    ///
    /// Fails with `Exists` if the name is registered or its directory exists.
    /// A concurrent create of the same name waits for this one and then
    /// fails with `Exists`. If the hook fails, its directory is removed and
    /// nothing is registered.
    pub fn create(
        &self,
        name: &str,
        author: &Author,
        creation_time: CreationTime,
    ) -> Result<Arc<H::Entity>, H::Error> {
        self.validate(name)?;
        let _lifecycle = self.lifecycle.read().expect("lifecycle lock poisoned");
        let _name = self.name_locks.lock(name);

        let mut reservation = {
            let mut registry = self.write_registry();
            if registry.rejects_calls() {
                return Err(self.closed_error().into());
            }
            if registry.children.contains_key(name) {
                return Err(self.exists_error(name).into());
            }
            registry.creating.insert(name.to_string());
            Reservation {
                registry: &self.registry,
                name,
                dir: None,
            }
        };

        let dir = self.child_dir(name);
        match fs::create_dir(&dir) {
            Ok(()) => reservation.dir = Some(dir.clone()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(self.exists_error(name).into());
            }
            Err(e) => return Err(self.failure(name, Box::new(e)).into()),
        }

        let child = self
            .hooks
            .create(&dir, &self.ctx, author, creation_time)
            .map_err(|source| {
                warn!(kind = H::KIND, name, error = %source, "create failed; rolling back");
                self.failure(name, source)
            })?;

        let child = Arc::new(child);
        reservation.commit(Arc::clone(&child));
        info!(kind = H::KIND, name, author = %author, "created");
        Ok(child)
    }

    /// Returns `true` if the directory for `name` exists, whether or not the
    /// entity is open. A name that is still being created does not exist yet.
    pub fn exists(&self, name: &str) -> Result<bool, H::Error> {
        self.validate(name)?;
        {
            let registry = self.read_registry();
            if registry.rejects_calls() {
                return Err(self.closed_error().into());
            }
            if registry.creating.contains(name) {
                return Ok(false);
            }
        }
        Ok(self.child_dir(name).is_dir())
    }

    /// Sorted names of every existing entity directory.
    pub fn list(&self) -> Result<Vec<String>, H::Error> {
        let creating = {
            let registry = self.read_registry();
            if registry.rejects_calls() {
                return Err(self.closed_error().into());
            }
            registry.creating.clone()
        };

        let root_name = self.root.display().to_string();
        let entries =
            fs::read_dir(&self.root).map_err(|e| self.failure(&root_name, Box::new(e)))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.failure(&root_name, Box::new(e)))?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_entity_name(&name).is_ok() && !creating.contains(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Close the manager and every live entity.
    ///
    /// New calls fail with `Closed` from the moment this starts. It then
    /// waits for in-flight `get`/`create` calls, runs each entity's close
    /// hook, and clears the cache this manager owns. Later calls are no-ops.
    /// `cause` is handed to the hooks unevaluated.
    pub fn close(&self, cause: &dyn Fn() -> ShutdownCause) {
        {
            let mut registry = self.write_registry();
            if registry.rejects_calls() {
                debug!(kind = H::KIND, "already closed");
                return;
            }
            registry.closing = true;
        }

        let _lifecycle = self.lifecycle.write().expect("lifecycle lock poisoned");
        let children = {
            let mut registry = self.write_registry();
            registry.closed = true;
            std::mem::take(&mut registry.children)
        };

        let mut children: Vec<_> = children.into_iter().collect();
        children.sort_by(|(a, _), (b, _)| a.cmp(b));
        let count = children.len();
        for (name, child) in children {
            self.hooks.close(&self.child_dir(&name), &child, cause);
            debug!(kind = H::KIND, name = %name, "closed");
        }

        if self.owns_cache {
            self.ctx.clear_cache();
        }
        info!(kind = H::KIND, root = %self.root.display(), closed = count, "storage manager closed");
    }

    /// Statistics of the shared cache, or the empty snapshot without one.
    /// Keeps working after close.
    pub fn cache_stats(&self) -> CacheStats {
        self.ctx.cache_stats()
    }

    pub fn is_closed(&self) -> bool {
        self.read_registry().closed
    }

    /// Number of live entity handles.
    pub fn open_count(&self) -> usize {
        self.read_registry().children.len()
    }

    fn child_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn validate(&self, name: &str) -> Result<(), StorageError> {
        validate_entity_name(name).map_err(|source| StorageError::InvalidName {
            kind: H::KIND,
            source,
        })
    }

    fn exists_error(&self, name: &str) -> StorageError {
        StorageError::Exists {
            kind: H::KIND,
            name: name.to_string(),
        }
    }

    fn not_found_error(&self, name: &str) -> StorageError {
        StorageError::NotFound {
            kind: H::KIND,
            name: name.to_string(),
        }
    }

    fn closed_error(&self) -> StorageError {
        StorageError::Closed { kind: H::KIND }
    }

    fn failure(&self, name: &str, source: BoxError) -> StorageError {
        StorageError::Failure {
            kind: H::KIND,
            name: name.to_string(),
            source,
        }
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Registry<H::Entity>> {
        self.registry.read().expect("registry lock poisoned")
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry<H::Entity>> {
        self.registry.write().expect("registry lock poisoned")
    }
}

impl<H: EntityHooks> std::fmt::Debug for DirectoryStorageManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryStorageManager")
            .field("kind", &H::KIND)
            .field("root", &self.root)
            .field("open", &self.open_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A name held in the `creating` set for the duration of a create.
///
/// Dropped without [`commit`](Self::commit), it removes the directory it
/// made (if any) and frees the name, so a failed or panicking create leaves
/// nothing behind.
struct Reservation<'a, E> {
    registry: &'a RwLock<Registry<E>>,
    name: &'a str,
    dir: Option<PathBuf>,
}

impl<E> Reservation<'_, E> {
    fn commit(mut self, child: Arc<E>) {
        self.dir = None;
        {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            registry.creating.remove(self.name);
            registry.children.insert(self.name.to_string(), child);
        }
    }
}

impl<E> Drop for Reservation<'_, E> {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to remove partially created directory");
            }
        }
        let mut registry = match self.registry.write() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.creating.remove(self.name);
    }
}
