//! External definition lookup
//!
//! Fetches a short authoritative definition of a financial term from a
//! single trusted reference site. Every failure becomes `None`.

use crate::models::Definition;
use crate::search::{SearchOptions, WebSearch};
use std::sync::Arc;
use tracing::{error, info, warn};

const TRUSTED_DOMAIN: &str = "investopedia.com";
const FINANCE_TOPIC: &str = "finance";

pub struct DefinitionLookup {
    search: Arc<dyn WebSearch>,
    options: SearchOptions,
}

impl DefinitionLookup {
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self {
            search,
            options: SearchOptions {
                max_results: 1,
                topic: Some(FINANCE_TOPIC.to_string()),
                include_domains: vec![TRUSTED_DOMAIN.to_string()],
            },
        }
    }

    pub async fn lookup(&self, term_query: &str) -> Option<Definition> {
        let hits = match self.search.search(term_query, &self.options).await {
            Ok(hits) => hits,
            Err(e) => {
                error!("Error calling search API: {}", e);
                return None;
            }
        };

        let Some(first) = hits.into_iter().next() else {
            warn!("Search returned no results for: {}", term_query);
            return None;
        };

        let content = first.content.trim();
        if content.is_empty() {
            warn!("First search result has empty content");
            return None;
        }

        info!("Definition found: {}", content);
        Some(Definition::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use crate::testing::StubSearch;

    #[tokio::test]
    async fn test_returns_first_result_content() {
        let search = Arc::new(StubSearch::with_content(
            "Earnings before interest, taxes, depreciation and amortization",
        ));
        let lookup = DefinitionLookup::new(search.clone());

        let definition = lookup.lookup("What is EBITDA?").await.unwrap();
        assert_eq!(
            definition.as_str(),
            "Earnings before interest, taxes, depreciation and amortization"
        );

        let options = search.last_options.lock().unwrap().clone().unwrap();
        assert_eq!(options.max_results, 1);
        assert_eq!(options.topic.as_deref(), Some("finance"));
        assert_eq!(options.include_domains, vec!["investopedia.com".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_none() {
        let lookup = DefinitionLookup::new(Arc::new(StubSearch::failing("401 unauthorized")));
        assert!(lookup.lookup("What is EBITDA?").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_results_is_none() {
        let lookup = DefinitionLookup::new(Arc::new(StubSearch::with_hits(vec![])));
        assert!(lookup.lookup("What is EBITDA?").await.is_none());
    }

    #[tokio::test]
    async fn test_blank_content_is_none() {
        let lookup = DefinitionLookup::new(Arc::new(StubSearch::with_hits(vec![SearchHit {
            title: "EBITDA".into(),
            url: String::new(),
            content: "  ".into(),
            score: None,
        }])));
        assert!(lookup.lookup("What is EBITDA?").await.is_none());
    }
}
