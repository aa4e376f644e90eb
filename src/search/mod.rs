//! Web search service
//!
//! External search providers sit behind [`WebSearch`]; the definition
//! lookup is the only caller.

use crate::config::Settings;
use crate::llm::http_client;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod tavily;
pub use tavily::TavilyClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub max_results: usize,
    pub topic: Option<String>,
    pub include_domains: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            topic: None,
            include_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub score: Option<f32>,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ranked hits, best first
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>>;
}

pub fn from_settings(settings: &Settings) -> Result<Arc<dyn WebSearch>> {
    Ok(Arc::new(TavilyClient::new(
        http_client(settings.request_timeout)?,
        settings.tavily_base_url.clone(),
        settings.tavily_api_key.clone(),
    )))
}
