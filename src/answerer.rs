//! Retrieval-augmented answerer
//!
//! Retrieves the top-k passages for a query from one corpus, stuffs them
//! into a grounded answering prompt and returns the model's answer with the
//! passages it was given. Failures propagate to the caller.

use crate::index::VectorIndexService;
use crate::llm::LanguageModel;
use crate::models::{join_passages, CorpusId, QaResponse};
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub const PROMPT_TEMPLATE: &str = r#"You are a precise and grounded assistant that answers financial report questions using only the context provided.

## Instructions

1. **Choose the Right Query**
   - If you are given both an original and a rewritten version of the question, use the original question when it is clear and directly answerable from the context.
   - Use the rewritten version only if the original is ambiguous or incomplete.
   - Do not mention which version of the question you are using, and do not comment on your reasoning or process.

2. **Extract Information**
   - Extract the values exactly as they appear in the context.
   - Preserve the original formatting and units (e.g., "$3.2M", "18%"). Never strip currency symbols or percent signs and never convert units.

3. **If Calculation is Required**
   - Only calculate when the question asks for a derived value that is not already stated in the context, and all required values are present.
   - Describe the logic in one plain-English sentence. Never write a symbolic formula.
   - Give the final result with appropriate units.

4. **If Any Value is Missing**
   - State exactly which value(s) are missing from the context and stop.
   - Do not guess, fabricate, or ask the user to provide values.

5. **Stay Grounded**
   - Rely strictly on the given context.
   - Do not use outside or world knowledge, assumptions, or commentary.

---

### Context:
{context}

{question}

---

## Final Answer:
"#;

/// Render the answering prompt for one question over one context block
pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Answerer bound to one corpus
pub struct RetrievalAnswerer {
    corpus: CorpusId,
    top_k: usize,
    llm: Arc<dyn LanguageModel>,
    index: Arc<dyn VectorIndexService>,
}

impl RetrievalAnswerer {
    pub fn new(
        corpus: CorpusId,
        top_k: usize,
        llm: Arc<dyn LanguageModel>,
        index: Arc<dyn VectorIndexService>,
    ) -> Self {
        Self {
            corpus,
            top_k,
            llm,
            index,
        }
    }

    pub async fn answer(&self, query: &str) -> Result<QaResponse> {
        let passages = self.index.retrieve(&self.corpus, query, self.top_k).await?;
        info!(
            corpus = %self.corpus,
            k = self.top_k,
            retrieved = passages.len(),
            "Answering from retrieved context"
        );

        let prompt = build_prompt(&join_passages(&passages), query);
        let result = self.llm.generate(&prompt).await?;

        Ok(QaResponse {
            result,
            source_documents: passages,
        })
    }
}
