//! Sufficiency judge
//!
//! Decides whether retrieved report context is enough to answer a query
//! without outside help. This is the branch point of the agent loop.

use crate::llm::{BooleanField, LanguageModel};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub const SUFFICIENCY_FIELD: BooleanField = BooleanField {
    name: "is_sufficient",
    description: "Does the context contain enough information to answer the query?",
};

pub struct SufficiencyJudge {
    llm: Arc<dyn LanguageModel>,
}

impl SufficiencyJudge {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// `context` is the retrieved passages joined in rank order, untouched.
    /// Blank context is judged insufficient without a model call.
    pub async fn is_context_sufficient(&self, query: &str, context: &str) -> Result<bool> {
        if context.trim().is_empty() {
            debug!("Empty context, judged insufficient");
            return Ok(false);
        }

        let prompt = build_prompt(query, context);
        let sufficient = self.llm.classify(&prompt, &SUFFICIENCY_FIELD).await?;
        info!("Context sufficient: {}", sufficient);
        Ok(sufficient)
    }
}

fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are checking whether excerpts from a financial report can answer a question.\n\n\
         ### Context:\n{}\n\n\
         ### Question:\n{}\n\n\
         Answer True only if the context explicitly contains every value or statement \
         needed to answer the question (a simple calculation from values present in the \
         context counts). Answer False if any required value, term or definition is \
         missing, or if the context is unrelated.",
        context, query
    )
}
