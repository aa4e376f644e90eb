//! LRU cache of loaded index handles
//!
//! Shared by all concurrent requests. Lookups promote recency, so the lock
//! is a mutex; the critical sections never span I/O. Loads run outside the
//! lock, which means two concurrent misses on one corpus may both load it
//! (the later insert wins).

use super::VectorIndex;
use crate::error::AgentError;
use crate::models::CorpusId;
use crate::Result;
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_CAPACITY: usize = 5;

pub struct IndexCache {
    entries: Mutex<LruCache<CorpusId, Arc<VectorIndex>>>,
}

impl IndexCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached handle, marking it most recently used
    pub async fn get(&self, corpus: &CorpusId) -> Option<Arc<VectorIndex>> {
        self.entries.lock().await.get(corpus).cloned()
    }

    /// Insert or replace a handle; returns the corpus evicted to make room
    pub async fn insert(&self, corpus: CorpusId, handle: Arc<VectorIndex>) -> Option<CorpusId> {
        let mut entries = self.entries.lock().await;
        match entries.push(corpus.clone(), handle) {
            Some((evicted, _)) if evicted != corpus => {
                info!(evicted = %evicted, "Evicted vector index from cache");
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Cached handle, or run `loader` and cache what it returns.
    /// A loader yielding `None` is reported as [`AgentError::IndexUnavailable`]
    /// and nothing is cached.
    pub async fn get_or_load<F, Fut>(&self, corpus: &CorpusId, loader: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<VectorIndex>>>,
    {
        if let Some(handle) = self.get(corpus).await {
            debug!(corpus = %corpus, "Vector index cache hit");
            return Ok(handle);
        }

        debug!(corpus = %corpus, "Vector index cache miss");
        let loaded = loader().await?.ok_or_else(|| {
            AgentError::IndexUnavailable(format!("Vector database not found for {}", corpus))
        })?;

        let handle = Arc::new(loaded);
        self.insert(corpus.clone(), handle.clone()).await;
        Ok(handle)
    }

    /// Presence check that does not touch recency
    pub async fn contains(&self, corpus: &CorpusId) -> bool {
        self.entries.lock().await.contains(corpus)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
