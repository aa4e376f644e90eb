//! OpenAI chat completions backend
//!
//! Structured classification uses a strict JSON schema response format so
//! the reply is a single-field object.

use super::{coerce_to_text, parse_boolean_field, BooleanField, LanguageModel};
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature,
        }
    }

    async fn complete(&self, prompt: &str, response_format: Option<Value>) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AgentError::ModelCall("OPENAI_API_KEY not configured".to_string())
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format,
        };

        debug!(model = %self.model, "Calling OpenAI chat completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                AgentError::ModelCall(format!("OpenAI request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI error response ({}): {}", status, error_text);
            return Err(AgentError::ModelCall(format!(
                "OpenAI returned {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AgentError::ModelCall(format!("OpenAI parse error: {}", e))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::ModelCall("No choices in OpenAI response".to_string()))?;

        Ok(coerce_to_text(&choice.message.content))
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, None).await
    }

    async fn classify(&self, prompt: &str, field: &BooleanField) -> Result<bool> {
        let raw = self
            .complete(prompt, Some(boolean_response_format(field)))
            .await?;
        parse_boolean_field(&raw, field.name)
    }
}

fn boolean_response_format(field: &BooleanField) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": field.name,
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    field.name: {
                        "type": "boolean",
                        "description": field.description,
                    }
                },
                "required": [field.name],
                "additionalProperties": false,
            }
        }
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Value,
}
