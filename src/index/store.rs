//! Flat cosine-similarity index persisted as a single JSON file

use super::embedding::cosine_similarity;
use super::DocumentChunk;
use crate::error::AgentError;
use crate::models::{CorpusId, RetrievedPassage};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// Immutable handle to one corpus' embedded chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub corpus: CorpusId,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(
        corpus: CorpusId,
        embedding_model: impl Into<String>,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(AgentError::Index(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.iter().any(|v| v.len() != dimensions) {
            return Err(AgentError::Index(
                "Embedding vectors have inconsistent dimensions".to_string(),
            ));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        Ok(Self {
            corpus,
            embedding_model: embedding_model.into(),
            dimensions,
            created_at: Utc::now(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored vectors keyed by chunk content hash
    pub fn vectors_by_hash(&self) -> HashMap<&str, &[f32]> {
        self.entries
            .iter()
            .map(|e| (e.chunk.hash.as_str(), e.vector.as_slice()))
            .collect()
    }

    /// Top-`k` chunks by cosine similarity, best first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedPassage> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.vector), e))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(_, e)| e.chunk.to_passage())
            .collect()
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let bytes = serde_json::to_vec(self)?;

        let target = dir.join(INDEX_FILE);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;

        info!(
            corpus = %self.corpus,
            chunks = self.entries.len(),
            "Saved vector index to {}",
            target.display()
        );
        Ok(())
    }

    /// `Ok(None)` when no index file exists in `dir`
    pub async fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(INDEX_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No vector index at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let index: VectorIndex = serde_json::from_slice(&bytes).map_err(|e| {
            AgentError::Index(format!("Corrupt index file {}: {}", path.display(), e))
        })?;
        info!(
            corpus = %index.corpus,
            chunks = index.entries.len(),
            "Loaded vector index from {}",
            path.display()
        );
        Ok(Some(index))
    }

    pub async fn exists_in(dir: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(dir.join(INDEX_FILE)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassageMetadata;

    fn chunk(text: &str, page: u32) -> DocumentChunk {
        DocumentChunk::new(
            text,
            PassageMetadata {
                source: "NASDAQ_AAPL_2024".into(),
                page: Some(page),
            },
        )
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::new(
            CorpusId::new("NASDAQ_AAPL_2024"),
            "test-model",
            vec![
                chunk("Net income", 1),
                chunk("Revenue", 2),
                chunk("Operating expenses", 3),
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
        )
        .unwrap()
    }

    #[test]
    fn test_search_ranks_by_similarity() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "Net income");
        assert_eq!(hits[1].content, "Operating expenses");
        assert_eq!(hits[0].metadata.page, Some(1));
    }

    #[test]
    fn test_search_k_larger_than_index() {
        assert_eq!(sample_index().search(&[0.0, 1.0], 10).len(), 3);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = VectorIndex::new(
            CorpusId::all(),
            "m",
            vec![chunk("a", 0)],
            vec![vec![1.0], vec![2.0]],
        );
        assert!(result.is_err());

        let ragged = VectorIndex::new(
            CorpusId::all(),
            "m",
            vec![chunk("a", 0), chunk("b", 1)],
            vec![vec![1.0, 0.0], vec![2.0]],
        );
        assert!(ragged.is_err());
    }

    #[test]
    fn test_vectors_by_hash() {
        let index = sample_index();
        let revenue = chunk("Revenue", 9);
        let by_hash = index.vectors_by_hash();
        assert_eq!(by_hash.len(), 3);
        assert_eq!(by_hash.get(revenue.hash.as_str()).copied(), Some(&[0.0, 1.0][..]));
        assert!(by_hash.get(chunk("Cash", 0).hash.as_str()).is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_dir = dir.path().join("NASDAQ_AAPL_2024");

        assert!(VectorIndex::load(&corpus_dir).await.unwrap().is_none());
        assert!(!VectorIndex::exists_in(&corpus_dir).await.unwrap());

        sample_index().save(&corpus_dir).await.unwrap();
        assert!(VectorIndex::exists_in(&corpus_dir).await.unwrap());

        let loaded = VectorIndex::load(&corpus_dir).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimensions, 2);
        assert_eq!(loaded.embedding_model, "test-model");
        assert_eq!(loaded.search(&[0.0, 1.0], 1)[0].content, "Revenue");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_index_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(INDEX_FILE), b"not json")
            .await
            .unwrap();
        let err = VectorIndex::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, AgentError::Index(_)));
    }
}
