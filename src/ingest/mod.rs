//! Report ingestion: PDF pages → text chunks → vector index

use crate::config::Settings;
use crate::error::AgentError;
use crate::index::VectorIndexService;
use crate::models::CorpusId;
use crate::Result;
use tracing::{error, info};

pub mod pdf;
pub mod splitter;

pub use pdf::{load_pdf_pages, PdfPage};
pub use splitter::{split_pages, TextSplitter};

/// Build the index for `corpus` from the reports under `settings.data_path`.
///
/// Returns `false` without touching the data directory when an index
/// already exists and `force` is not set. Corpus ids that are not a single
/// plain file name are rejected before any path is built.
pub async fn create_index(
    service: &dyn VectorIndexService,
    settings: &Settings,
    corpus: &CorpusId,
    force: bool,
) -> Result<bool> {
    if !corpus.is_path_safe() {
        return Err(AgentError::Ingest(format!("Invalid corpus id: {:?}", corpus.as_str())));
    }
    if !force && service.exists(corpus).await? {
        info!(corpus = %corpus, "Index already exists. Skipping re-indexing.");
        return Ok(false);
    }

    info!(corpus = %corpus, "Loading data");
    let pages = load_pdf_pages(&settings.data_path, corpus).await?;
    if pages.is_empty() {
        error!(corpus = %corpus, "No documents to index");
        return Err(AgentError::Ingest(format!(
            "No PDF pages found for {} in {}",
            corpus,
            settings.data_path.display()
        )));
    }

    let chunks = split_pages(&pages, settings.chunk_size, settings.chunk_overlap);
    if chunks.is_empty() {
        return Err(AgentError::Ingest(format!(
            "No extractable text in the reports for {}",
            corpus
        )));
    }

    service.build(corpus, chunks).await?;
    info!(corpus = %corpus, "Index created successfully");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubIndexService;

    #[tokio::test]
    async fn test_existing_index_is_skipped() {
        let service = StubIndexService::new();
        let settings = Settings {
            data_path: "/nonexistent/reports".into(),
            ..Settings::default()
        };

        let built = create_index(&service, &settings, &CorpusId::new("NASDAQ_AAPL_2024"), false)
            .await
            .unwrap();
        assert!(!built);
    }

    #[tokio::test]
    async fn test_forced_reindex_reads_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let service = StubIndexService::new();
        let settings = Settings {
            data_path: dir.path().to_path_buf(),
            ..Settings::default()
        };

        let err = create_index(&service, &settings, &CorpusId::new("NASDAQ_AAPL_2024"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Ingest(_)));

        let err = create_index(&service, &settings, &CorpusId::all(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Ingest(_)));
    }

    #[tokio::test]
    async fn test_path_like_corpus_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let service = StubIndexService::new();
        let settings = Settings {
            data_path: dir.path().join("reports"),
            ..Settings::default()
        };

        for bad in ["../x", "..", "a/b", ""] {
            let err = create_index(&service, &settings, &CorpusId::new(bad), true)
                .await
                .unwrap_err();
            assert!(matches!(err, AgentError::Ingest(ref m) if m.contains("Invalid corpus id")));
        }
    }
}
