//! Agentic orchestrator
//!
//! Primary (stateless) flow:
//!
//! START → [TERM_CHECK] → ANSWER → SUFFICIENT? → DONE
//!                                     └─ no → DEFINE → REWRITE → RETRY_ANSWER → DONE
//!
//! At most one retry, and the retry is not re-judged. The history-aware flow
//! rewrites the question against the conversation first, then answers in a
//! single pass. Both entry points always return an [`AnswerEnvelope`].

use crate::answerer::RetrievalAnswerer;
use crate::classifier::TermClassifier;
use crate::config::Settings;
use crate::error::AgentError;
use crate::index::VectorIndexService;
use crate::llm::LanguageModel;
use crate::lookup::DefinitionLookup;
use crate::memory::ConversationHistory;
use crate::models::{join_passages, AnswerEnvelope, CorpusId};
use crate::rewriter::{Grounding, QueryRewriter};
use crate::search::WebSearch;
use crate::sufficiency::SufficiencyJudge;
use crate::Result;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const TERM_NOT_FOUND_MESSAGE: &str = "Sorry, I couldn't find information about that term.";
pub const GENERIC_ERROR_MESSAGE: &str = "Sorry, I encountered an error processing your request.";

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_PIPELINE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Passages retrieved per answer call
    pub top_k: usize,
    /// Classify the query first and send definition questions straight to lookup
    pub term_check: bool,
    /// Deadline for one whole request
    pub pipeline_timeout: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            term_check: false,
            pipeline_timeout: DEFAULT_PIPELINE_TIMEOUT,
        }
    }
}

impl From<&Settings> for OrchestratorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            top_k: settings.top_k,
            term_check: settings.term_check,
            pipeline_timeout: settings.pipeline_timeout,
        }
    }
}

/// Coordinates classifier, judge, lookup, rewriter and answerer for one request
pub struct Orchestrator {
    llm: Arc<dyn LanguageModel>,
    index: Arc<dyn VectorIndexService>,
    classifier: TermClassifier,
    judge: SufficiencyJudge,
    rewriter: QueryRewriter,
    lookup: DefinitionLookup,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        index: Arc<dyn VectorIndexService>,
        search: Arc<dyn WebSearch>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            classifier: TermClassifier::new(llm.clone()),
            judge: SufficiencyJudge::new(llm.clone()),
            rewriter: QueryRewriter::new(llm.clone()),
            lookup: DefinitionLookup::new(search),
            llm,
            index,
            options,
        }
    }

    /// Dispatch to the history-aware flow when a conversation is supplied,
    /// otherwise to the stateless sufficiency-driven flow
    pub async fn agentic_answer(
        &self,
        query: &str,
        corpus: &CorpusId,
        history: Option<&ConversationHistory>,
    ) -> AnswerEnvelope {
        match history {
            Some(history) => self.answer_with_history(query, corpus, history).await,
            None => self.answer(query, corpus).await,
        }
    }

    /// Stateless flow: answer, judge the context, and if it falls short look
    /// the term up, rewrite the question and answer exactly once more
    pub async fn answer(&self, query: &str, corpus: &CorpusId) -> AnswerEnvelope {
        let span = info_span!("agentic_answer", request_id = %Uuid::new_v4(), corpus = %corpus);
        self.guarded(self.run_sufficiency_flow(query, corpus))
            .instrument(span)
            .await
    }

    /// Conversational flow: rewrite against the history, then answer once
    pub async fn answer_with_history(
        &self,
        query: &str,
        corpus: &CorpusId,
        history: &ConversationHistory,
    ) -> AnswerEnvelope {
        let span = info_span!(
            "agentic_answer_with_history",
            request_id = %Uuid::new_v4(),
            corpus = %corpus,
            turns = history.len()
        );
        self.guarded(self.run_history_flow(query, corpus, history))
            .instrument(span)
            .await
    }

    fn answerer(&self, corpus: &CorpusId) -> RetrievalAnswerer {
        RetrievalAnswerer::new(
            corpus.clone(),
            self.options.top_k,
            self.llm.clone(),
            self.index.clone(),
        )
    }

    /// Request boundary: every failure, panics included, becomes the generic apology
    async fn guarded<F>(&self, flow: F) -> AnswerEnvelope
    where
        F: Future<Output = Result<AnswerEnvelope>>,
    {
        let started = Instant::now();
        let flow = AssertUnwindSafe(flow).catch_unwind();
        match tokio::time::timeout(self.options.pipeline_timeout, flow).await {
            Ok(Ok(Ok(envelope))) => {
                info!(
                    sources = envelope.sources.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Agentic pipeline complete"
                );
                envelope
            }
            Ok(Ok(Err(e))) => {
                error!("Error in agentic pipeline: {}", e);
                AnswerEnvelope::apology(GENERIC_ERROR_MESSAGE)
            }
            Ok(Err(panic)) => {
                let msg = if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else {
                    "unknown panic".to_string()
                };
                error!("Panic in agentic pipeline: {}", msg);
                AnswerEnvelope::apology(GENERIC_ERROR_MESSAGE)
            }
            Err(_) => {
                let e = AgentError::Timeout(format!(
                    "agentic pipeline exceeded {:?}",
                    self.options.pipeline_timeout
                ));
                error!("Error in agentic pipeline: {}", e);
                AnswerEnvelope::apology(GENERIC_ERROR_MESSAGE)
            }
        }
    }

    async fn run_sufficiency_flow(&self, query: &str, corpus: &CorpusId) -> Result<AnswerEnvelope> {
        let answerer = self.answerer(corpus);

        if self.options.term_check && self.is_definition_query(query).await {
            info!("Definition query, going straight to lookup");
            return self.define_and_retry(query, &answerer).await;
        }

        let first = answerer.answer(query).await?;
        let context = join_passages(&first.source_documents);
        if self.judge.is_context_sufficient(query, &context).await? {
            info!("Context sufficient, answering from the report");
            return Ok(first.into());
        }

        info!("Context insufficient, looking up the term");
        self.define_and_retry(query, &answerer).await
    }

    async fn define_and_retry(
        &self,
        query: &str,
        answerer: &RetrievalAnswerer,
    ) -> Result<AnswerEnvelope> {
        let Some(definition) = self.lookup.lookup(query).await else {
            warn!("No definition found");
            return Ok(AnswerEnvelope::apology(TERM_NOT_FOUND_MESSAGE));
        };

        let Some(rewritten) = self
            .rewriter
            .rewrite(query, Grounding::Definition(&definition))
            .await
        else {
            warn!("Definition rewrite unavailable");
            return Ok(AnswerEnvelope::apology(TERM_NOT_FOUND_MESSAGE));
        };

        debug!("Retrying with rewritten query");
        let retry = answerer.answer(&rewritten).await?;
        Ok(retry.into())
    }

    async fn run_history_flow(
        &self,
        query: &str,
        corpus: &CorpusId,
        history: &ConversationHistory,
    ) -> Result<AnswerEnvelope> {
        let question = match self.rewriter.rewrite(query, Grounding::History(history)).await {
            Some(rewritten) => format_history_query(&rewritten, query),
            None => {
                warn!("History rewrite unavailable, using the original question");
                query.to_string()
            }
        };
        info!("Formatted query: {}", question);

        let qa = self.answerer(corpus).answer(&question).await?;
        Ok(qa.into())
    }

    /// Classifier failures count as "not a definition"
    async fn is_definition_query(&self, query: &str) -> bool {
        match self.classifier.is_definition_query(query).await {
            Ok(is_definition) => is_definition,
            Err(e) => {
                warn!("Term classification failed, treating as direct question: {}", e);
                false
            }
        }
    }
}

/// Question handed to the answerer after a history rewrite. Both forms are
/// kept so the answering prompt can prefer the original when it is clear.
pub fn format_history_query(rewritten: &str, original: &str) -> String {
    format!(
        "### Rewritten query based on history:\n{}\nOriginal Question: {}",
        rewritten, original
    )
}
