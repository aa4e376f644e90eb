//! Scripted collaborators shared by unit tests

use crate::error::AgentError;
use crate::index::{DocumentChunk, VectorIndex, VectorIndexService};
use crate::llm::{BooleanField, LanguageModel};
use crate::models::{CorpusId, RetrievedPassage};
use crate::search::{SearchHit, SearchOptions, WebSearch};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted reply for one model call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Bool(bool),
    Fail(String),
}

/// Language model that answers from per-field queues.
///
/// `classify` pops from the queue registered for the field name; `generate`
/// pops from the generation queue. Every prompt is recorded.
#[derive(Default)]
pub struct ScriptedModel {
    classify_replies: Mutex<Vec<(&'static str, VecDeque<Reply>)>>,
    generate_replies: Mutex<VecDeque<Reply>>,
    pub prompts: Mutex<Vec<String>>,
    pub classify_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_classify(self, field: &'static str, reply: Reply) -> Self {
        {
            let mut queues = self.classify_replies.lock().unwrap();
            match queues.iter_mut().find(|(name, _)| *name == field) {
                Some((_, q)) => q.push_back(reply),
                None => queues.push((field, VecDeque::from([reply]))),
            }
        }
        self
    }

    pub fn on_generate(self, reply: Reply) -> Self {
        self.generate_replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.generate_replies.lock().unwrap().pop_front() {
            Some(Reply::Text(t)) => Ok(t),
            Some(Reply::Fail(e)) => Err(AgentError::ModelCall(e)),
            other => panic!("unexpected generate call, script had {:?}", other),
        }
    }

    async fn classify(&self, prompt: &str, field: &BooleanField) -> Result<bool> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = {
            let mut queues = self.classify_replies.lock().unwrap();
            queues
                .iter_mut()
                .find(|(name, _)| *name == field.name)
                .and_then(|(_, q)| q.pop_front())
        };
        match reply {
            Some(Reply::Bool(b)) => Ok(b),
            Some(Reply::Fail(e)) => Err(AgentError::ModelCall(e)),
            other => panic!("unexpected classify call for {}, script had {:?}", field.name, other),
        }
    }
}

/// Search provider returning a fixed result, or failing
pub struct StubSearch {
    result: Result<Vec<SearchHit>>,
    pub calls: AtomicUsize,
    pub last_options: Mutex<Option<SearchOptions>>,
}

impl StubSearch {
    pub fn with_content(content: &str) -> Self {
        Self::with_hits(vec![SearchHit {
            title: "Definition".into(),
            url: "https://www.investopedia.com/terms/x.asp".into(),
            content: content.into(),
            score: Some(0.9),
        }])
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            result: Ok(hits),
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(AgentError::Lookup(message.into())),
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WebSearch for StubSearch {
    async fn search(&self, _query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        match &self.result {
            Ok(hits) => Ok(hits.clone()),
            Err(e) => Err(AgentError::Lookup(e.to_string())),
        }
    }
}

/// Index service that serves scripted passage lists per retrieve call
pub struct StubIndexService {
    responses: Mutex<VecDeque<Result<Vec<RetrievedPassage>>>>,
    pub retrieve_calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl StubIndexService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            retrieve_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn then_passages(self, passages: Vec<RetrievedPassage>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(passages));
        self
    }

    pub fn then_error(self, error: AgentError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndexService for StubIndexService {
    async fn retrieve(
        &self,
        _corpus: &CorpusId,
        query: &str,
        _k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected retrieve call for query: {}", query))
    }

    async fn load(&self, _corpus: &CorpusId) -> Result<Option<Arc<VectorIndex>>> {
        Ok(None)
    }

    async fn build(&self, corpus: &CorpusId, _chunks: Vec<DocumentChunk>) -> Result<Arc<VectorIndex>> {
        Err(AgentError::Index(format!("stub cannot build {}", corpus)))
    }

    async fn exists(&self, _corpus: &CorpusId) -> Result<bool> {
        Ok(true)
    }
}

pub fn passage(content: &str) -> RetrievedPassage {
    RetrievedPassage::new(content, "NASDAQ_AAPL_2024", Some(1))
}
