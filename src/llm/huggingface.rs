//! Hugging Face inference endpoint backend
//!
//! Text-generation endpoints have no schema-constrained output, so
//! classification asks for a one-field JSON object and parses it tolerantly.

use super::{coerce_to_text, parse_boolean_field, BooleanField, LanguageModel};
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

const MAX_NEW_TOKENS: u32 = 512;

pub struct HuggingFaceEndpointModel {
    client: Client,
    endpoint: String,
    token: Option<String>,
    model: String,
}

impl HuggingFaceEndpointModel {
    pub fn new(client: Client, base_url: String, token: Option<String>, model: String) -> Self {
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), model);
        Self {
            client,
            endpoint,
            token,
            model,
        }
    }

    async fn text_generation(&self, prompt: &str) -> Result<String> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AgentError::ModelCall("HF_TOKEN not configured".to_string()))?;

        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: MAX_NEW_TOKENS,
                return_full_text: false,
                do_sample: false,
            },
        };

        debug!(model = %self.model, "Calling HF inference endpoint");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("HF request failed: {}", e);
                AgentError::ModelCall(format!("HF request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("HF error response ({}): {}", status, error_text);
            return Err(AgentError::ModelCall(format!(
                "HF endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AgentError::ModelCall(format!("HF parse error: {}", e)))?;

        extract_generated_text(&body)
    }
}

#[async_trait]
impl LanguageModel for HuggingFaceEndpointModel {
    fn name(&self) -> &str {
        "hf"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.text_generation(prompt).await
    }

    async fn classify(&self, prompt: &str, field: &BooleanField) -> Result<bool> {
        let structured_prompt = format!(
            "{}\n\nRespond with ONLY a JSON object of the form {{\"{}\": true}} or {{\"{}\": false}}, where {} is: {}",
            prompt, field.name, field.name, field.name, field.description
        );
        let raw = self.text_generation(&structured_prompt).await?;
        parse_boolean_field(&raw, field.name)
    }
}

/// Endpoints answer either `[{"generated_text": ..}]` or `{"generated_text": ..}`
fn extract_generated_text(body: &Value) -> Result<String> {
    let first = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    first
        .and_then(|v| v.get("generated_text"))
        .map(coerce_to_text)
        .ok_or_else(|| {
            AgentError::ModelCall(format!("HF response missing generated_text: {}", body))
        })
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    return_full_text: bool,
    do_sample: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_from_list_and_object() {
        let list = json!([{"generated_text": "EBITDA"}]);
        assert_eq!(extract_generated_text(&list).unwrap(), "EBITDA");

        let obj = json!({"generated_text": "net income"});
        assert_eq!(extract_generated_text(&obj).unwrap(), "net income");
    }

    #[test]
    fn test_extract_missing_field_is_model_error() {
        let err = extract_generated_text(&json!({"error": "loading"})).unwrap_err();
        assert!(matches!(err, AgentError::ModelCall(_)));
        assert!(extract_generated_text(&json!([])).is_err());
    }

    #[test]
    fn test_endpoint_joins_model() {
        let model = HuggingFaceEndpointModel::new(
            Client::new(),
            "https://example.test/models/".into(),
            None,
            "mistralai/Mistral-7B-Instruct-v0.3".into(),
        );
        assert_eq!(
            model.endpoint,
            "https://example.test/models/mistralai/Mistral-7B-Instruct-v0.3"
        );
    }
}
