//! Core data models for the financial report assistant

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

//
// ================= Corpus =================
//

/// Identifier of one indexed document corpus (a report name, or `all`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorpusId(String);

impl CorpusId {
    pub const ALL: &'static str = "all";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The merged index over every report
    pub fn all() -> Self {
        Self(Self::ALL.to_string())
    }

    /// `None` or a blank name selects the merged index
    pub fn from_optional(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => Self::new(n),
            _ => Self::all(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    /// A single plain path component, safe to join under a data or index root
    pub fn is_path_safe(&self) -> bool {
        let name = self.0.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).components().count() == 1
    }
}

impl fmt::Display for CorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ================= Retrieval =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Source document id (file stem of the report)
    pub source: String,
    /// Zero-based page index within the source document
    pub page: Option<u32>,
}

/// A passage returned by the vector index, ranked by similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub metadata: PassageMetadata,
}

impl RetrievedPassage {
    pub fn new(content: impl Into<String>, source: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            content: content.into(),
            metadata: PassageMetadata {
                source: source.into(),
                page,
            },
        }
    }
}

/// Concatenate passages in rank order, the way they are stuffed into prompts
pub fn join_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

//
// ================= Definition =================
//

/// One-sentence definition fetched from the external knowledge source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition(String);

impl Definition {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ================= Answers =================
//

/// Output of one retrieval-augmented answer call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaResponse {
    pub result: String,
    pub source_documents: Vec<RetrievedPassage>,
}

/// Terminal output handed to callers. Always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEnvelope {
    pub response: String,
    pub sources: Vec<RetrievedPassage>,
}

impl AnswerEnvelope {
    pub fn apology(message: &str) -> Self {
        Self {
            response: message.to_string(),
            sources: Vec::new(),
        }
    }

    /// Numbered, truncated view of the sources for display
    pub fn source_summaries(&self) -> Vec<SourceSummary> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, p)| SourceSummary::from_passage(i + 1, p))
            .collect()
    }
}

impl From<QaResponse> for AnswerEnvelope {
    fn from(qa: QaResponse) -> Self {
        Self {
            response: qa.result,
            sources: qa.source_documents,
        }
    }
}

const SOURCE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub number: usize,
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
}

impl SourceSummary {
    fn from_passage(number: usize, passage: &RetrievedPassage) -> Self {
        let content = if passage.content.chars().count() > SOURCE_PREVIEW_CHARS {
            let preview: String = passage.content.chars().take(SOURCE_PREVIEW_CHARS).collect();
            format!("{}...", preview)
        } else {
            passage.content.clone()
        };

        Self {
            number,
            content,
            source: passage.metadata.source.clone(),
            page: passage.metadata.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_id_defaults_to_all() {
        assert!(CorpusId::from_optional(None).is_all());
        assert!(CorpusId::from_optional(Some("  ")).is_all());
        assert_eq!(
            CorpusId::from_optional(Some("NASDAQ_AAPL_2024")).as_str(),
            "NASDAQ_AAPL_2024"
        );
    }

    #[test]
    fn test_corpus_id_path_safety() {
        assert!(CorpusId::new("NASDAQ_AAPL_2024").is_path_safe());
        assert!(CorpusId::all().is_path_safe());
        for bad in ["", ".", "..", "../x", "a/b", "a\\b", "/etc"] {
            assert!(!CorpusId::new(bad).is_path_safe(), "{:?}", bad);
        }
    }

    #[test]
    fn test_join_keeps_rank_order_and_duplicates() {
        let passages = vec![
            RetrievedPassage::new("Net income was $93.7B.", "NASDAQ_AAPL_2024", Some(3)),
            RetrievedPassage::new("Revenue was $391.0B.", "NASDAQ_AAPL_2024", Some(2)),
            RetrievedPassage::new("Net income was $93.7B.", "NASDAQ_AAPL_2024", Some(3)),
        ];
        assert_eq!(
            join_passages(&passages),
            "Net income was $93.7B.\n\nRevenue was $391.0B.\n\nNet income was $93.7B."
        );
        assert_eq!(join_passages(&[]), "");
    }

    #[test]
    fn test_source_summaries_truncate_long_content() {
        let envelope = AnswerEnvelope {
            response: "ok".into(),
            sources: vec![
                RetrievedPassage::new("x".repeat(250), "NASDAQ_AMZN_2024", Some(10)),
                RetrievedPassage::new("short", "NASDAQ_AMZN_2024", None),
            ],
        };

        let summaries = envelope.source_summaries();
        assert_eq!(summaries[0].number, 1);
        assert_eq!(summaries[0].content.chars().count(), 203);
        assert!(summaries[0].content.ends_with("..."));
        assert_eq!(summaries[1].content, "short");
        assert_eq!(summaries[1].page, None);
    }

    #[test]
    fn test_apology_has_no_sources() {
        let envelope = AnswerEnvelope::apology("Sorry.");
        assert_eq!(envelope.response, "Sorry.");
        assert!(envelope.sources.is_empty());
    }
}
