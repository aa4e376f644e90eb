//! Text embedding providers
//!
//! - [`HuggingFaceEmbedder`]: feature-extraction pipeline of a
//!   sentence-transformers model on the HF inference API.
//! - [`OpenAiEmbedder`]: `POST /embeddings`.

use crate::config::{EmbeddingBackend, Settings};
use crate::error::AgentError;
use crate::llm::http_client;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier stored alongside every index built with it
    fn model(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Shape("Embedding provider returned no vector".into()))
    }
}

pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let client = http_client(settings.request_timeout)?;
    let embedder: Arc<dyn Embedder> = match settings.embedding_backend {
        EmbeddingBackend::HuggingFace => {
            info!("Loading embedding model: {}", settings.embedding_model);
            Arc::new(HuggingFaceEmbedder::new(
                client,
                settings.hf_base_url.clone(),
                settings.hf_token.clone(),
                settings.embedding_model.clone(),
            ))
        }
        EmbeddingBackend::OpenAi => {
            info!("Loading embedding model: {}", settings.openai_embedding_model);
            Arc::new(OpenAiEmbedder::new(
                client,
                settings.openai_base_url.clone(),
                settings.openai_api_key.clone(),
                settings.openai_embedding_model.clone(),
            ))
        }
    };
    Ok(embedder)
}

pub struct HuggingFaceEmbedder {
    client: Client,
    endpoint: String,
    token: Option<String>,
    model: String,
}

impl HuggingFaceEmbedder {
    pub fn new(client: Client, base_url: String, token: Option<String>, model: String) -> Self {
        let endpoint = format!(
            "{}/{}/pipeline/feature-extraction",
            base_url.trim_end_matches('/'),
            model
        );
        Self {
            client,
            endpoint,
            token,
            model,
        }
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AgentError::Index("HF_TOKEN not configured".to_string()))?;

        debug!(count = texts.len(), model = %self.model, "Embedding texts");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({ "inputs": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Index(format!(
                "Embedding endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await?;
        let vectors = parse_feature_extraction(&body)?;
        if vectors.len() != texts.len() {
            return Err(AgentError::Shape(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

/// Sentence models return one vector per input; token-level models return
/// one vector per token, which is mean-pooled here.
fn parse_feature_extraction(body: &Value) -> Result<Vec<Vec<f32>>> {
    let items = body
        .as_array()
        .ok_or_else(|| AgentError::Shape(format!("Expected an array of embeddings: {}", body)))?;

    items.iter().map(parse_one_embedding).collect()
}

fn parse_one_embedding(item: &Value) -> Result<Vec<f32>> {
    let rows = item
        .as_array()
        .ok_or_else(|| AgentError::Shape("Embedding is not an array".into()))?;

    if rows.iter().all(Value::is_number) {
        return Ok(rows.iter().filter_map(Value::as_f64).map(|v| v as f32).collect());
    }

    let tokens: Vec<Vec<f32>> = rows
        .iter()
        .map(parse_one_embedding)
        .collect::<Result<_>>()?;
    mean_pool(&tokens)
}

fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>> {
    let dims = tokens
        .first()
        .map(Vec::len)
        .ok_or_else(|| AgentError::Shape("Empty token embedding list".into()))?;

    let mut pooled = vec![0.0f32; dims];
    for token in tokens {
        if token.len() != dims {
            return Err(AgentError::Shape("Ragged token embeddings".into()));
        }
        for (acc, v) in pooled.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= n);
    Ok(pooled)
}

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: Client, base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Index("OPENAI_API_KEY not configured".to_string()))?;

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Index(format!(
                "Embeddings API returned {}: {}",
                status, error_text
            )));
        }

        let mut parsed: OpenAiEmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Cosine similarity in `[-1, 1]`; `0.0` for empty or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
