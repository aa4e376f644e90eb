//! Term classifier
//!
//! Decides whether a user query asks for the definition of a financial
//! term or concept (e.g. "what is EBITDA?") rather than for a figure
//! from the report.

use crate::llm::{BooleanField, LanguageModel};
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub const DEFINITION_FIELD: BooleanField = BooleanField {
    name: "is_definition_query",
    description: "Is the query a request for a definition of a financial term or concept?",
};

pub struct TermClassifier {
    llm: Arc<dyn LanguageModel>,
}

impl TermClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Model failures are returned to the caller, which decides the fallback
    pub async fn is_definition_query(&self, query: &str) -> Result<bool> {
        let prompt = build_prompt(query);
        let is_definition = self.llm.classify(&prompt, &DEFINITION_FIELD).await?;
        info!("Is definition query: {}", is_definition);
        Ok(is_definition)
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        "User query: {}\n\
         Is this a request for a definition of a financial term or concept? \
         Answer True or False.",
        query
    )
}
