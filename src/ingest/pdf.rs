//! PDF page loading

use crate::error::AgentError;
use crate::models::CorpusId;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extracted text of one report page
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    /// File stem of the report, e.g. `NASDAQ_AAPL_2024`
    pub source: String,
    /// Zero-based
    pub page: u32,
    pub text: String,
}

/// Pages of `<data_path>/<corpus>.pdf`, or of every PDF in `data_path` for `all`
pub async fn load_pdf_pages(data_path: &Path, corpus: &CorpusId) -> Result<Vec<PdfPage>> {
    if !corpus.is_path_safe() {
        return Err(AgentError::Ingest(format!("Invalid corpus id: {:?}", corpus.as_str())));
    }
    let files = if corpus.is_all() {
        list_pdfs(data_path).await?
    } else {
        let path = data_path.join(format!("{}.pdf", corpus));
        if !tokio::fs::try_exists(&path).await? {
            return Err(AgentError::Ingest(format!(
                "Data path {} does not exist",
                path.display()
            )));
        }
        vec![path]
    };

    info!("Loading PDF files from {}", data_path.display());
    let mut pages = Vec::new();
    for file in &files {
        pages.extend(read_pdf(file).await?);
    }

    if pages.is_empty() {
        warn!("No PDF files found in the data path {}", data_path.display());
    } else {
        info!(
            "Successfully loaded {} pages from {} PDF files",
            pages.len(),
            files.len()
        );
    }
    Ok(pages)
}

async fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !tokio::fs::try_exists(dir).await? {
        return Err(AgentError::Ingest(format!(
            "Data path {} does not exist",
            dir.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_pdf(path: &Path) -> Result<Vec<PdfPage>> {
    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = tokio::fs::read(path).await?;

    let display = path.display().to_string();
    let texts = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| AgentError::Ingest(format!("PDF extraction aborted for {}: {}", display, e)))?
    .map_err(|e| AgentError::Ingest(format!("Failed to extract text from {}: {}", display, e)))?;

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PdfPage {
            source: source.clone(),
            page: i as u32,
            text,
        })
        .collect())
}
