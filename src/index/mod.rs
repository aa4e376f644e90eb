//! Vector index service
//!
//! Per-corpus similarity indexes over report chunks. The pipeline only
//! talks to [`VectorIndexService`]; the local implementation keeps one
//! flat index file per corpus and an LRU cache of loaded handles.

use crate::models::{CorpusId, PassageMetadata, RetrievedPassage};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

pub mod cache;
pub mod embedding;
pub mod local;
pub mod store;

pub use cache::IndexCache;
pub use embedding::{Embedder, HuggingFaceEmbedder, OpenAiEmbedder};
pub use local::LocalIndexService;
pub use store::VectorIndex;

/// A chunk of report text ready to be embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: PassageMetadata,
    /// SHA-256 of `content`, hex encoded
    pub hash: String,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, metadata: PassageMetadata) -> Self {
        let content = content.into();
        let hash = hex::encode(Sha256::digest(content.as_bytes()));
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            metadata,
            hash,
        }
    }

    pub fn to_passage(&self) -> RetrievedPassage {
        RetrievedPassage {
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[async_trait]
pub trait VectorIndexService: Send + Sync {
    /// Top-`k` passages for `query`, most similar first
    async fn retrieve(
        &self,
        corpus: &CorpusId,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>>;

    /// Handle for a built corpus, or `None` when nothing was built
    async fn load(&self, corpus: &CorpusId) -> Result<Option<Arc<VectorIndex>>>;

    /// Embed and persist `chunks` as the index for `corpus`
    async fn build(&self, corpus: &CorpusId, chunks: Vec<DocumentChunk>) -> Result<Arc<VectorIndex>>;

    async fn exists(&self, corpus: &CorpusId) -> Result<bool>;
}
