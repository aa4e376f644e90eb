//! Query rewriter
//!
//! Turns a user question into a retrieval-friendly question, grounded either
//! in the conversation so far or in an externally fetched definition.
//! Failures never escape: they surface as `None` ("rewrite unavailable").

use crate::llm::LanguageModel;
use crate::memory::ConversationHistory;
use crate::models::Definition;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Material the rewrite is grounded in
#[derive(Debug, Clone, Copy)]
pub enum Grounding<'a> {
    History(&'a ConversationHistory),
    Definition(&'a Definition),
}

impl Grounding<'_> {
    fn mode(&self) -> &'static str {
        match self {
            Grounding::History(_) => "history",
            Grounding::Definition(_) => "definition",
        }
    }
}

pub struct QueryRewriter {
    llm: Arc<dyn LanguageModel>,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn rewrite(&self, query: &str, grounding: Grounding<'_>) -> Option<String> {
        let prompt = match grounding {
            Grounding::History(history) => history_prompt(query, history),
            Grounding::Definition(definition) => definition_prompt(query, definition),
        };

        match self.llm.generate(&prompt).await {
            Ok(content) => {
                let content = content.trim();
                if content.is_empty() {
                    warn!(mode = grounding.mode(), "Model returned an empty rewrite");
                    return None;
                }
                info!(mode = grounding.mode(), "Rewritten query: {}", content);
                Some(content.to_string())
            }
            Err(e) => {
                error!(mode = grounding.mode(), "Error rewriting query: {}", e);
                None
            }
        }
    }
}

fn history_prompt(query: &str, history: &ConversationHistory) -> String {
    format!(
        "Conversation so far:\n{}\n\
         Original Question: {}\n\
         Rewrite the original question as a clear, concise, natural-language query suitable for searching a financial report.\n\
         \n\
         ### Guidelines:\n\
         - Use standard financial definitions for all terms (e.g., use 'net income' for 'earnings', 'revenue' for 'sales').\n\
         - Only use information from the conversation history if the original question refers to previous discussion.\n\
         - If the original question is clear and self-contained, ignore the conversation history and rewrite based only on the current question.\n\
         - Do NOT use or substitute values or components from previous questions or answers unless the user explicitly refers to them.\n\
         - Only include financial components that are explicitly mentioned or required by the original question.\n\
         - If the question requires a calculation (e.g., a financial ratio), rewrite it to explicitly request the necessary input values and the final result.\n\
         - Briefly describe the calculation logic in plain English (e.g., 'net income divided by number of shares'), but do NOT give formulas, step-by-step instructions or numeric examples.\n\
         - Do NOT ask the user to provide any values or make assumptions.\n\
         - Refer only to actual company data as reported, no examples or hypotheticals.\n\
         - Format the rewritten query as a single, well-formed question that could be answered using a financial document.\n\
         - Return only the rewritten question.\n",
        history.format_for_prompt(),
        query
    )
}

fn definition_prompt(query: &str, definition: &Definition) -> String {
    format!(
        "Original Question: {}\n\
         Definition of the financial term (from an external reference):\n{}\n\
         Rewrite the original question as a single, self-contained question that can be answered from the company's own financial report.\n\
         \n\
         ### Guidelines:\n\
         - List every financial component the definition says is required (e.g., each line item that must be added or subtracted).\n\
         - Describe how the components combine in plain English; do NOT write a formula.\n\
         - Do NOT copy any example numbers that appear inside the definition text.\n\
         - Do NOT ask the user to provide any values.\n\
         - Ask about the real company and report the question refers to, never a hypothetical company.\n\
         - Request the reported values of each component and the resulting figure.\n\
         - Return only the rewritten question.\n",
        query, definition
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedModel};

    #[tokio::test]
    async fn test_history_mode_prompt_carries_turns() {
        let llm = Arc::new(ScriptedModel::new().on_generate(Reply::Text(
            "What was Apple's net income in fiscal 2023?".into(),
        )));
        let rewriter = QueryRewriter::new(llm.clone());

        let mut history = ConversationHistory::new();
        history.push_user("What were Apple's earnings in 2024?");
        history.push_assistant("Net income was $93,736 million.");

        let rewritten = rewriter
            .rewrite("And the year before?", Grounding::History(&history))
            .await;

        assert_eq!(
            rewritten.as_deref(),
            Some("What was Apple's net income in fiscal 2023?")
        );
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("User: What were Apple's earnings in 2024?"));
        assert!(prompt.contains("Original Question: And the year before?"));
        assert!(prompt.contains("'net income' for 'earnings'"));
        assert!(prompt.contains("ignore the conversation history"));
        assert!(prompt.contains("Do NOT ask the user"));
    }

    #[tokio::test]
    async fn test_history_mode_with_empty_history() {
        let llm = Arc::new(ScriptedModel::new().on_generate(Reply::Text("What is revenue?".into())));
        let rewriter = QueryRewriter::new(llm.clone());

        let history = ConversationHistory::new();
        rewriter
            .rewrite("What are sales?", Grounding::History(&history))
            .await;

        assert!(llm.prompts()[0].contains("Beginning of the conversation"));
    }

    #[tokio::test]
    async fn test_definition_mode_prompt_rules() {
        let llm = Arc::new(ScriptedModel::new().on_generate(Reply::Text(
            "What are the company's net income, interest, taxes, depreciation and amortization, and their sum?"
                .into(),
        )));
        let rewriter = QueryRewriter::new(llm.clone());
        let definition =
            Definition::new("Earnings before interest, taxes, depreciation and amortization");

        let rewritten = rewriter
            .rewrite("What is EBITDA?", Grounding::Definition(&definition))
            .await
            .unwrap();

        assert!(rewritten.contains("interest"));
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Earnings before interest, taxes, depreciation and amortization"));
        assert!(prompt.contains("do NOT write a formula"));
        assert!(prompt.contains("Do NOT copy any example numbers"));
        assert!(prompt.contains("never a hypothetical company"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_none() {
        let llm = Arc::new(ScriptedModel::new().on_generate(Reply::Fail("503".into())));
        let rewriter = QueryRewriter::new(llm);
        let definition = Definition::new("Price divided by earnings per share");

        assert!(rewriter
            .rewrite("What is the P/E ratio?", Grounding::Definition(&definition))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_blank_rewrite_becomes_none() {
        let llm = Arc::new(ScriptedModel::new().on_generate(Reply::Text("   ".into())));
        let rewriter = QueryRewriter::new(llm);
        let history = ConversationHistory::new();

        assert!(rewriter
            .rewrite("What is revenue?", Grounding::History(&history))
            .await
            .is_none());
    }
}
