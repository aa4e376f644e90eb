//! Tavily search API client

use super::{SearchHit, SearchOptions, WebSearch};
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TavilyClient {
    pub fn new(client: Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Lookup("TAVILY_API_KEY not configured".to_string()))?;

        let request = SearchRequest {
            query,
            max_results: options.max_results,
            topic: options.topic.as_deref(),
            include_domains: &options.include_domains,
        };

        debug!(max_results = options.max_results, "Calling Tavily search");

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Tavily request failed: {}", e);
                AgentError::Lookup(format!("Tavily request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Lookup(format!(
                "Tavily returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Lookup(format!("Invalid JSON response: {}", e)))?;

        parse_results(body)
    }
}

fn parse_results(body: Value) -> Result<Vec<SearchHit>> {
    let results = body
        .get("results")
        .cloned()
        .ok_or_else(|| AgentError::Lookup("Tavily response has no 'results' key".to_string()))?;

    serde_json::from_value(results)
        .map_err(|e| AgentError::Lookup(format!("Malformed Tavily results: {}", e)))
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    #[serde(skip_serializing_if = "no_domains")]
    include_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let domains = vec!["investopedia.com".to_string()];
        let request = SearchRequest {
            query: "What is EBITDA?",
            max_results: 1,
            topic: Some("finance"),
            include_domains: &domains,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_results"], 1);
        assert_eq!(json["topic"], "finance");
        assert_eq!(json["include_domains"][0], "investopedia.com");
    }

    #[test]
    fn test_parse_results() {
        let body = json!({
            "query": "What is EBITDA?",
            "results": [{
                "title": "EBITDA",
                "url": "https://www.investopedia.com/terms/e/ebitda.asp",
                "content": "Earnings before interest, taxes, depreciation and amortization",
                "score": 0.98
            }]
        });

        let hits = parse_results(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.starts_with("Earnings before interest"));
    }

    #[test]
    fn test_missing_results_key() {
        let err = parse_results(json!({"detail": "unauthorized"})).unwrap_err();
        assert!(matches!(err, AgentError::Lookup(_)));
    }

    #[test]
    fn test_result_without_content_is_malformed() {
        assert!(parse_results(json!({"results": [{"title": "x"}]})).is_err());
    }
}
