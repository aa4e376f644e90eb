//! File-backed index service: one directory per corpus under a root path

use super::{DocumentChunk, Embedder, IndexCache, VectorIndex, VectorIndexService};
use crate::error::AgentError;
use crate::models::{CorpusId, RetrievedPassage};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const EMBED_BATCH_SIZE: usize = 32;

pub struct LocalIndexService {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
    cache: IndexCache,
}

impl LocalIndexService {
    pub fn new(root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>, cache_capacity: usize) -> Self {
        Self {
            root: root.into(),
            embedder,
            cache: IndexCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    fn corpus_dir(&self, corpus: &CorpusId) -> Result<PathBuf> {
        if !corpus.is_path_safe() {
            return Err(AgentError::Index(format!("Invalid corpus id: {:?}", corpus.as_str())));
        }
        Ok(self.root.join(corpus.as_str()))
    }

    async fn read_from_disk(&self, corpus: &CorpusId) -> Result<Option<VectorIndex>> {
        let dir = self.corpus_dir(corpus)?;
        let Some(index) = VectorIndex::load(&dir).await? else {
            info!("No vector database found at {}", dir.display());
            return Ok(None);
        };

        if index.embedding_model != self.embedder.model() {
            return Err(AgentError::Index(format!(
                "Index for {} was built with {} but the active embedding model is {}; re-index it",
                corpus,
                index.embedding_model,
                self.embedder.model()
            )));
        }
        Ok(Some(index))
    }

    /// Index already on disk for `corpus`, if its vectors can be reused.
    /// Unreadable files and other embedding models give `None`.
    async fn previous_for_reuse(&self, corpus: &CorpusId, dir: &Path) -> Option<VectorIndex> {
        match VectorIndex::load(dir).await {
            Ok(Some(index)) if index.embedding_model == self.embedder.model() => Some(index),
            Ok(Some(index)) => {
                info!(
                    corpus = %corpus,
                    "Previous index used {}, embedding everything",
                    index.embedding_model
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(corpus = %corpus, "Previous index unreadable, embedding everything: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl VectorIndexService for LocalIndexService {
    async fn retrieve(
        &self,
        corpus: &CorpusId,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let index = self
            .cache
            .get_or_load(corpus, || self.read_from_disk(corpus))
            .await?;

        if index.is_empty() || k == 0 {
            warn!(corpus = %corpus, "Nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let passages = index.search(&query_vector, k);
        info!(corpus = %corpus, k, returned = passages.len(), "Retrieved passages");
        Ok(passages)
    }

    async fn load(&self, corpus: &CorpusId) -> Result<Option<Arc<VectorIndex>>> {
        match self
            .cache
            .get_or_load(corpus, || self.read_from_disk(corpus))
            .await
        {
            Ok(handle) => Ok(Some(handle)),
            Err(AgentError::IndexUnavailable(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn build(&self, corpus: &CorpusId, chunks: Vec<DocumentChunk>) -> Result<Arc<VectorIndex>> {
        if chunks.is_empty() {
            return Err(AgentError::Index("No text chunks provided".to_string()));
        }
        let dir = self.corpus_dir(corpus)?;
        info!(corpus = %corpus, "Creating vector database with {} text chunks", chunks.len());

        let previous = self.previous_for_reuse(corpus, &dir).await;
        let known = previous
            .as_ref()
            .map(VectorIndex::vectors_by_hash)
            .unwrap_or_default();

        let mut vectors: Vec<Option<Vec<f32>>> = chunks
            .iter()
            .map(|c| known.get(c.hash.as_str()).map(|v| v.to_vec()))
            .collect();
        let missing: Vec<usize> = (0..chunks.len()).filter(|&i| vectors[i].is_none()).collect();
        info!(
            corpus = %corpus,
            reused = chunks.len() - missing.len(),
            embedding = missing.len(),
            "Embedding changed chunks"
        );

        for batch in missing.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].content.clone()).collect();
            let embedded = self.embedder.embed(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(AgentError::Index(format!(
                    "Embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }
            for (&i, vector) in batch.iter().zip(embedded) {
                vectors[i] = Some(vector);
            }
        }
        let vectors: Vec<Vec<f32>> = vectors.into_iter().flatten().collect();

        let index = VectorIndex::new(corpus.clone(), self.embedder.model(), chunks, vectors)?;
        index.save(&dir).await?;

        let handle = Arc::new(index);
        self.cache.insert(corpus.clone(), handle.clone()).await;
        Ok(handle)
    }

    async fn exists(&self, corpus: &CorpusId) -> Result<bool> {
        VectorIndex::exists_in(&self.corpus_dir(corpus)?).await
    }
}
