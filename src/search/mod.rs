//! Web Search Layer
//!
//! Pluggable search providers behind the `SearchProvider` trait, and the
//! `SearchClient` the research loop talks to.
//!
//! Search is best-effort: every failure mode (timeout, HTTP error, bad
//! payload) is logged and converted to "no result" inside `SearchClient`.
//! Nothing from this layer can fail a section.

mod aggregator;
mod tavily;

pub use aggregator::ResultAggregator;
pub use tavily::TavilyProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::SharedMetrics;
use crate::config::{SearchConfig, SearchTopic};
use crate::types::{ReportError, one_line};

// =============================================================================
// Data Model
// =============================================================================

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    /// Short excerpt most relevant to the query
    #[serde(default)]
    pub content: String,
    /// Full page content, when requested and available
    #[serde(default)]
    pub raw_content: Option<String>,
}

/// Results for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// Parameters for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub topic: SearchTopic,
    /// Recency window; only sent for the news topic
    pub days: Option<u32>,
    pub max_results: u32,
    pub include_raw_content: bool,
}

/// Search failures. Never leave this module raw: `SearchClient` degrades them.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode search response: {0}")]
    Decode(String),
}

// =============================================================================
// Provider Trait
// =============================================================================

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Execute one search query
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

pub type SharedSearchProvider = Arc<dyn SearchProvider>;

/// Create a search provider from configuration
pub fn create_search_provider(config: &SearchConfig) -> crate::types::Result<SharedSearchProvider> {
    match config.provider.as_str() {
        "tavily" => Ok(Arc::new(TavilyProvider::new(config)?)),
        other => Err(ReportError::Config(format!(
            "Unknown search provider: {}. Supported: tavily",
            other
        ))),
    }
}

// =============================================================================
// Search Client
// =============================================================================

/// Timeout-enforcing, failure-absorbing front for a search provider
#[derive(Clone)]
pub struct SearchClient {
    provider: SharedSearchProvider,
    timeout: Duration,
    topic: SearchTopic,
    days: Option<u32>,
    max_results: u32,
    include_raw_content: bool,
    metrics: Option<SharedMetrics>,
}

impl SearchClient {
    pub fn new(provider: SharedSearchProvider, config: &SearchConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(config.timeout_secs),
            topic: config.topic,
            days: config.days,
            max_results: config.max_results,
            include_raw_content: config.include_raw_content,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_for(&self, query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            topic: self.topic,
            days: match self.topic {
                SearchTopic::News => self.days,
                SearchTopic::General => None,
            },
            max_results: self.max_results,
            include_raw_content: self.include_raw_content,
        }
    }

    /// Run one query. Timeouts and failures become `None`.
    pub async fn search(&self, query: &str) -> Option<SearchResponse> {
        let request = self.request_for(query);

        let outcome = match tokio::time::timeout(self.timeout, self.provider.search(&request)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.timeout)),
        };

        let response = match outcome {
            Ok(response) => {
                debug!(
                    provider = self.provider.name(),
                    query = %one_line(query),
                    results = response.results.len(),
                    "Search completed"
                );
                Some(response)
            }
            Err(err) => {
                warn!(
                    provider = self.provider.name(),
                    query = %one_line(query),
                    error = %err,
                    "Search failed; continuing without its results"
                );
                None
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_search(response.is_none());
        }
        response
    }

    /// Run all queries concurrently; keeps successful responses in query order
    pub async fn search_all(&self, queries: &[String]) -> Vec<SearchResponse> {
        join_all(queries.iter().map(|query| self.search(query)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}
