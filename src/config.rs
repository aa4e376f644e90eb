//! Runtime configuration
//!
//! Settings are read once from the process environment (after `.env` has
//! been loaded by the host) and passed explicitly to every service.

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Which language model backend answers prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    /// Hosted OpenAI chat model
    OpenAi,
    /// Self-hosted / Hugging Face inference endpoint
    HuggingFace,
}

impl FromStr for LlmBackend {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmBackend::OpenAi),
            "hf" | "huggingface" => Ok(LlmBackend::HuggingFace),
            other => Err(AgentError::Config(format!("Invalid LLM model: {}", other))),
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmBackend::OpenAi => "openai",
            LlmBackend::HuggingFace => "hf",
        };
        write!(f, "{}", s)
    }
}

/// Which service turns text into vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    HuggingFace,
    OpenAi,
}

impl FromStr for EmbeddingBackend {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hf" | "huggingface" => Ok(EmbeddingBackend::HuggingFace),
            "openai" => Ok(EmbeddingBackend::OpenAi),
            other => Err(AgentError::Config(format!(
                "Invalid embedding backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm_backend: LlmBackend,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub hf_token: Option<String>,
    pub hf_model: String,
    pub hf_base_url: String,
    pub temperature: f32,

    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub openai_embedding_model: String,

    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,

    pub db_path: PathBuf,
    pub data_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub index_cache_capacity: usize,

    pub request_timeout: Duration,
    pub pipeline_timeout: Duration,
    pub term_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::OpenAi,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            hf_token: None,
            hf_model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
            hf_base_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            temperature: 0.0,
            embedding_backend: EmbeddingBackend::HuggingFace,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            openai_embedding_model: "text-embedding-3-small".to_string(),
            tavily_api_key: None,
            tavily_base_url: "https://api.tavily.com".to_string(),
            db_path: PathBuf::from("vector_db/"),
            data_path: PathBuf::from("data/"),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            index_cache_capacity: 5,
            request_timeout: Duration::from_secs(60),
            pipeline_timeout: Duration::from_secs(180),
            term_check: false,
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration");
        let defaults = Settings::default();

        let settings = Settings {
            llm_backend: match env::var("LLM_MODEL") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.llm_backend,
            },
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: string_var("OPENAI_LLM_MODEL", defaults.openai_model),
            openai_base_url: string_var("OPENAI_BASE_URL", defaults.openai_base_url),
            hf_token: non_empty_var("HF_TOKEN"),
            hf_model: string_var("HF_LLM_MODEL", defaults.hf_model),
            hf_base_url: string_var("HF_INFERENCE_URL", defaults.hf_base_url),
            temperature: parsed_var("LLM_TEMPERATURE", defaults.temperature)?,
            embedding_backend: match env::var("EMBEDDING_BACKEND") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.embedding_backend,
            },
            embedding_model: string_var("HF_EMBEDDING_MODEL", defaults.embedding_model),
            openai_embedding_model: string_var(
                "OPENAI_EMBEDDING_MODEL",
                defaults.openai_embedding_model,
            ),
            tavily_api_key: non_empty_var("TAVILY_API_KEY"),
            tavily_base_url: string_var("TAVILY_BASE_URL", defaults.tavily_base_url),
            db_path: env::var("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            data_path: env::var("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            chunk_size: parsed_var("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parsed_var("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parsed_var("NUM_OF_DOCS_TO_RETRIEVE", defaults.top_k)?,
            index_cache_capacity: parsed_var(
                "INDEX_CACHE_CAPACITY",
                defaults.index_cache_capacity,
            )?,
            request_timeout: Duration::from_secs(parsed_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            pipeline_timeout: Duration::from_secs(parsed_var(
                "PIPELINE_TIMEOUT_SECS",
                defaults.pipeline_timeout.as_secs(),
            )?),
            term_check: parsed_var("TERM_CHECK", defaults.term_check)?,
        };

        settings.validate()?;
        info!(
            llm = %settings.llm_backend,
            top_k = settings.top_k,
            "Configuration loaded successfully"
        );
        Ok(settings)
    }

    /// Reject combinations the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(AgentError::Config("CHUNK_SIZE must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AgentError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(AgentError::Config(
                "NUM_OF_DOCS_TO_RETRIEVE must be positive".into(),
            ));
        }
        if self.index_cache_capacity == 0 {
            return Err(AgentError::Config(
                "INDEX_CACHE_CAPACITY must be positive".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(AgentError::Config(
                "REQUEST_TIMEOUT_SECS must be positive".into(),
            ));
        }
        if self.pipeline_timeout.is_zero() {
            return Err(AgentError::Config(
                "PIPELINE_TIMEOUT_SECS must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn string_var(key: &str, default: String) -> String {
    non_empty_var(key).unwrap_or(default)
}

fn parsed_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("openai".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("HF".parse::<LlmBackend>().unwrap(), LlmBackend::HuggingFace);
        assert!("llama".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn test_default_chunking_and_retrieval() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 500);
        assert_eq!(settings.chunk_overlap, 50);
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.index_cache_capacity, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let settings = Settings {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let settings = Settings {
            request_timeout: Duration::ZERO,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(AgentError::Config(ref m)) if m.contains("REQUEST_TIMEOUT_SECS")
        ));

        let settings = Settings {
            pipeline_timeout: Duration::ZERO,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(AgentError::Config(ref m)) if m.contains("PIPELINE_TIMEOUT_SECS")
        ));
    }
}
