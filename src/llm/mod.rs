//! Language model service
//!
//! Two call shapes are used by the pipeline: free-form generation and a
//! structured yes/no classification. Backends are swappable behind
//! [`LanguageModel`] and selected by the `LLM_MODEL` setting.

use crate::config::{LlmBackend, Settings};
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod huggingface;
pub mod openai;

pub use huggingface::HuggingFaceEndpointModel;
pub use openai::OpenAiChatModel;

/// Schema of a structured answer holding exactly one boolean field
#[derive(Debug, Clone, Copy)]
pub struct BooleanField {
    pub name: &'static str,
    pub description: &'static str,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Unstructured completion
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Structured completion constrained to a single boolean field
    async fn classify(&self, prompt: &str, field: &BooleanField) -> Result<bool>;
}

/// Build the configured backend
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match settings.llm_backend {
        LlmBackend::OpenAi => {
            info!("Initializing OpenAI LLM: {}", settings.openai_model);
            Arc::new(OpenAiChatModel::new(
                http_client(settings.request_timeout)?,
                settings.openai_base_url.clone(),
                settings.openai_api_key.clone(),
                settings.openai_model.clone(),
                settings.temperature,
            ))
        }
        LlmBackend::HuggingFace => {
            info!("Initializing HF LLM: {}", settings.hf_model);
            Arc::new(HuggingFaceEndpointModel::new(
                http_client(settings.request_timeout)?,
                settings.hf_base_url.clone(),
                settings.hf_token.clone(),
                settings.hf_model.clone(),
            ))
        }
    };
    Ok(model)
}

/// Long-lived, connection-pooled client with a per-request deadline
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()
        .map_err(AgentError::from)
}

/// Normalize whatever a backend put in its content slot into plain text.
///
/// Strings pass through. Arrays of content parts are joined on their `text`
/// fields. Anything else is stringified and logged.
pub fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) if !parts.is_empty() => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str).or_else(|| p.as_str()))
                .collect();
            if texts.len() == parts.len() {
                texts.concat()
            } else {
                let s = value.to_string();
                warn!("Content was not a string, converted to: {}", s);
                s
            }
        }
        Value::Null => {
            warn!("Content was null, converted to empty string");
            String::new()
        }
        other => {
            let s = other.to_string();
            warn!("Content was not a string, converted to: {}", s);
            s
        }
    }
}

/// Read a boolean field out of a model reply.
///
/// Accepts a bare JSON object, one wrapped in a ```json fence, or text with
/// surrounding chatter. Falls back to a leading `true`/`false` word.
pub fn parse_boolean_field(raw: &str, field: &str) -> Result<bool> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let candidate = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&cleaned[start..=end]),
        _ => None,
    };

    if let Some(json_str) = candidate {
        if let Ok(parsed) = serde_json::from_str::<Value>(json_str) {
            match parsed.get(field) {
                Some(Value::Bool(b)) => return Ok(*b),
                Some(Value::String(s)) => {
                    if let Some(b) = parse_bool_word(s) {
                        return Ok(b);
                    }
                }
                _ => {}
            }
        }
    }

    let first_word = cleaned
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or_default();

    parse_bool_word(first_word).ok_or_else(|| {
        AgentError::ModelCall(format!(
            "Expected boolean field '{}' in model output: {}",
            field, raw
        ))
    })
}

fn parse_bool_word(word: &str) -> Option<bool> {
    match word.trim().to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}
