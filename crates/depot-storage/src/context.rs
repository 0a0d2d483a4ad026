//! Shared resources threaded into every entity.

use std::sync::Arc;

use depot_cache::{CacheStats, RepositoryCache};
use tokio::runtime::Handle;

/// Resources handed unchanged to every entity's open and create hooks.
///
/// The executor belongs to the caller: the manager clones the handle but
/// never shuts the runtime down. The cache is shared by the manager and all
/// of its entities; only the manager that built it clears it.
#[derive(Clone, Debug)]
pub struct ChildContext {
    executor: Handle,
    cache: Option<Arc<RepositoryCache>>,
}

impl ChildContext {
    pub fn new(executor: Handle, cache: Option<Arc<RepositoryCache>>) -> Self {
        Self { executor, cache }
    }

    /// Runtime on which entities may defer background work.
    pub fn executor(&self) -> &Handle {
        &self.executor
    }

    /// The shared cache, if caching is enabled.
    pub fn cache(&self) -> Option<&Arc<RepositoryCache>> {
        self.cache.as_ref()
    }

    /// Statistics of the shared cache, or the empty snapshot without one.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }

    pub(crate) fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    #[test]
    fn stats_without_cache_are_empty() {
        let rt = runtime();
        let ctx = ChildContext::new(rt.handle().clone(), None);
        assert!(ctx.cache().is_none());
        assert_eq!(ctx.cache_stats(), CacheStats::empty());
        ctx.clear_cache();
    }

    #[test]
    fn stats_come_from_cache() {
        let rt = runtime();
        let cache = Arc::new(RepositoryCache::from_spec_str("maximumSize=4").unwrap());
        let ctx = ChildContext::new(rt.handle().clone(), Some(Arc::clone(&cache)));
        cache.get("missing");
        assert_eq!(ctx.cache_stats().miss_count, 1);
    }

    #[test]
    fn clones_share_the_cache() {
        let rt = runtime();
        let cache = Arc::new(RepositoryCache::from_spec_str("maximumSize=4").unwrap());
        let ctx = ChildContext::new(rt.handle().clone(), Some(cache));
        let copy = ctx.clone();
        ctx.cache().unwrap().put("k", b"v".to_vec());
        assert!(copy.cache().unwrap().get("k").is_some());
        copy.clear_cache();
        assert!(ctx.cache().unwrap().is_empty());
    }
}
