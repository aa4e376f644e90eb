//! Financial Report Assistant
//!
//! Retrieval-augmented question answering over annual-report PDFs, driven by
//! a small agent loop:
//! - answers from the report corpus first
//! - judges whether the retrieved context was sufficient
//! - if not, fetches a definition of the term from a trusted reference,
//!   rewrites the question around it, and answers once more
//!
//! A conversational entry point rewrites follow-up questions against the
//! chat history before answering.

pub mod agent;
pub mod answerer;
pub mod classifier;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod lookup;
pub mod memory;
pub mod models;
pub mod rewriter;
pub mod search;
pub mod sufficiency;

#[cfg(test)]
mod testing;

pub use error::{AgentError, Result};

// Re-export common types
pub use agent::{Orchestrator, OrchestratorOptions};
pub use config::Settings;
pub use memory::ConversationHistory;
pub use models::*;
