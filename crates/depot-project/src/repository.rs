use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use depot_cache::RepositoryCache;
use depot_storage::{BoxError, ChildContext, DirectoryStorageManager, EntityHooks, ShutdownCause};
use depot_types::{Author, CreationTime};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{RepositoryError, RepositoryResult};
use crate::metadata::CreationMetadata;

/// Subdirectory holding a repository's files.
const CONTENT_DIR: &str = "content";

/// Manager of the repositories inside one project.
pub type RepositoryManager = DirectoryStorageManager<RepositoryHooks>;

/// Open/closed state and the count of queued background writes.
///
/// Kept under one lock so a write is either counted before close looks at
/// `pending`, or refused.
#[derive(Default)]
struct WriteState {
    closed: bool,
    pending: usize,
    shutdown: Option<ShutdownCause>,
}

/// State shared between a repository and its background writes.
struct Shared {
    name: String,
    content: PathBuf,
    cache: Option<Arc<RepositoryCache>>,
    state: Mutex<WriteState>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, WriteState> {
        self.state.lock().expect("repository state lock poisoned")
    }

    fn ensure_open(&self) -> RepositoryResult<()> {
        self.check_open(&self.lock_state())
    }

    fn check_open(&self, state: &WriteState) -> RepositoryResult<()> {
        if !state.closed {
            return Ok(());
        }
        Err(match &state.shutdown {
            Some(cause) => RepositoryError::ShutDown {
                name: self.name.clone(),
                cause: cause.clone(),
            },
            None => RepositoryError::Closed(self.name.clone()),
        })
    }

    /// Count a background write, unless already closed.
    fn begin_write(&self) -> RepositoryResult<()> {
        let mut state = self.lock_state();
        self.check_open(&state)?;
        state.pending += 1;
        Ok(())
    }

    fn end_write(&self) {
        let mut state = self.lock_state();
        state.pending = state.pending.saturating_sub(1);
    }

    fn close(&self, cause: &dyn Fn() -> ShutdownCause) {
        let mut state = self.lock_state();
        if state.closed {
            return;
        }
        if state.pending > 0 {
            let cause = cause();
            warn!(repo = %self.name, pending = state.pending, cause = %cause, "closing repository with pending writes");
            state.shutdown = Some(cause);
        }
        state.closed = true;
    }

    fn cache_key(&self, path: &str) -> String {
        format!("{}/{}", self.content.display(), path)
    }

    fn write(&self, path: &str, data: &[u8]) -> RepositoryResult<()> {
        self.ensure_open()?;
        let target = self.content.join(path);
        let parent = target.parent().unwrap_or(&self.content);
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;

        if let Some(cache) = &self.cache {
            cache.invalidate(&self.cache_key(path));
        }
        debug!(repo = %self.name, path, len = data.len(), "file written");
        Ok(())
    }
}

/// A named tree of files under a project.
///
/// Reads go through the shared cache when one is configured. Writes replace
/// files atomically and invalidate their cache entries.
pub struct Repository {
    dir: PathBuf,
    metadata: CreationMetadata,
    executor: Handle,
    shared: Arc<Shared>,
}

impl Repository {
    fn new(dir: &Path, metadata: CreationMetadata, ctx: &ChildContext) -> Self {
        Self {
            dir: dir.to_path_buf(),
            executor: ctx.executor().clone(),
            shared: Arc::new(Shared {
                name: metadata.name.clone(),
                content: dir.join(CONTENT_DIR),
                cache: ctx.cache().cloned(),
                state: Mutex::new(WriteState::default()),
            }),
            metadata,
        }
    }

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

    /// Read a file by its path relative to the repository root.
    pub fn read_file(&self, path: &str) -> RepositoryResult<Arc<[u8]>> {
        self.shared.ensure_open()?;
        validate_path(path)?;
        let full = self.shared.content.join(path);
        let load = || match std::fs::read(&full) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RepositoryError::FileNotFound(path.to_string()))
            }
            Err(e) => Err(RepositoryError::Io(e)),
        };
        match &self.shared.cache {
            Some(cache) => cache.get_or_load(&self.shared.cache_key(path), load),
            None => load().map(Arc::from),
        }
    }

    /// Write a file, replacing any previous content.
    pub fn write_file(&self, path: &str, data: &[u8]) -> RepositoryResult<()> {
        validate_path(path)?;
        self.shared.write(path, data)
    }

    /// Write a file on the shared executor.
    ///
    /// A write still queued when the repository closes fails with the
    /// shutdown cause.
    pub fn write_file_async(
        &self,
        path: &str,
        data: Vec<u8>,
    ) -> RepositoryResult<JoinHandle<RepositoryResult<()>>> {
        validate_path(path)?;
        self.shared.begin_write()?;

        let shared = Arc::clone(&self.shared);
        let path = path.to_string();
        Ok(self.executor.spawn_blocking(move || {
            let result = shared.write(&path, &data);
            shared.end_write();
            result
        }))
    }

    /// Background writes not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.shared.lock_state().pending
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock_state().closed
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name())
            .field("dir", &self.dir)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Hooks wiring [`Repository`] into a [`DirectoryStorageManager`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RepositoryHooks;

impl EntityHooks for RepositoryHooks {
    type Entity = Repository;
    type Error = RepositoryError;
    const KIND: &'static str = "repository";

    fn open(&self, dir: &Path, ctx: &ChildContext) -> Result<Repository, BoxError> {
        let metadata = CreationMetadata::read(dir)?;
        let content = dir.join(CONTENT_DIR);
        if !content.is_dir() {
            return Err(format!("missing content directory: {}", content.display()).into());
        }
        Ok(Repository::new(dir, metadata, ctx))
    }

    fn create(
        &self,
        dir: &Path,
        ctx: &ChildContext,
        author: &Author,
        creation_time: CreationTime,
    ) -> Result<Repository, BoxError> {
        std::fs::create_dir(dir.join(CONTENT_DIR))?;
        let metadata = CreationMetadata::new(entity_name(dir), author.clone(), creation_time);
        metadata.write(dir)?;
        Ok(Repository::new(dir, metadata, ctx))
    }

    fn close(&self, _dir: &Path, repo: &Repository, cause: &dyn Fn() -> ShutdownCause) {
        repo.shared.close(cause);
    }
}

/// The final component of an entity directory.
pub(crate) fn entity_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Accept only non-empty relative paths made of plain components.
fn validate_path(path: &str) -> RepositoryResult<()> {
    let p = Path::new(path);
    let plain = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)))
        && !path.ends_with('/');
    if plain {
        Ok(())
    } else {
        Err(RepositoryError::InvalidPath(path.to_string()))
    }
}
