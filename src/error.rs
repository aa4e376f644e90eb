//! Error types for the financial report assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Pipeline Errors
    // =============================

    /// Language model unreachable or returned unusable output
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// Search provider unreachable or returned an empty/malformed result
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Requested corpus has no built index
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// A collaborator returned a value of unexpected shape
    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
