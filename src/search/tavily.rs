//! Tavily Search Provider
//!
//! POST `{api_base}/search` with the API key in the JSON body.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SearchError, SearchProvider, SearchRequest, SearchResponse, SearchResult};
use crate::config::{SearchConfig, SearchTopic};
use crate::constants::{network, search as search_constants};
use crate::types::{ReportError, Result};

pub struct TavilyProvider {
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TavilyProvider {
    /// Key from `TAVILY_API_KEY`
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ReportError::Config("Tavily API key not found. Set TAVILY_API_KEY".to_string())
            })?;
        Self::with_key(config, SecretString::from(api_key))
    }

    pub fn with_key(config: &SearchConfig, api_key: SecretString) -> Result<Self> {
        let api_base = config
            .api_base
            .as_deref()
            .unwrap_or(search_constants::TAVILY_API_BASE);
        let api_base = url::Url::parse(api_base)
            .map_err(|e| ReportError::Config(format!("Invalid search endpoint '{}': {}", api_base, e)))?
            .as_str()
            .trim_end_matches('/')
            .to_string();

        // The per-query deadline is enforced by SearchClient; this is only a backstop
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base,
            client,
        })
    }

    fn body<'a>(&'a self, request: &'a SearchRequest) -> TavilyRequest<'a> {
        TavilyRequest {
            api_key: self.api_key.expose_secret(),
            query: &request.query,
            topic: request.topic,
            days: match request.topic {
                SearchTopic::News => request.days,
                SearchTopic::General => None,
            },
            max_results: request.max_results,
            include_raw_content: request.include_raw_content,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, request: &SearchRequest) -> std::result::Result<SearchResponse, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.api_base))
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(SearchResponse {
            query: payload.query.unwrap_or_else(|| request.query.clone()),
            results: payload.results,
        })
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    topic: SearchTopic,
    #[serde(skip_serializing_if = "Option::is_none")]
    days: Option<u32>,
    max_results: u32,
    include_raw_content: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}
