//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait with two call shapes:
//! schema-guided output (`generate`) and free-form text (`complete`).
//! All providers report token usage so the pipeline can track consumption.
//!
//! ## Modules
//!
//! - `chain`: Retry and fallback chain over one or more providers
//! - `openai`: OpenAI and Azure OpenAI Chat Completions
//! - `ollama`: Local Ollama chat endpoint

mod chain;
mod ollama;
mod openai;
mod prompt_utils;

pub use chain::{ChainConfig, ChainStats, ChainedProvider, ProviderChain, ProviderChainBuilder};
pub use ollama::OllamaProvider;
pub use openai::{OpenAiFlavor, OpenAiProvider};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{ReportError, Result};

// =============================================================================
// Request
// =============================================================================

/// A system/user message pair sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

// =============================================================================
// Responses with Usage Metrics
// =============================================================================

/// Schema-guided LLM response: raw reply text plus usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Reply text as returned by the model, not yet parsed or checked
    /// against a contract
    pub content: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Free-form LLM response: raw text plus usage metrics
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub text: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmCompletion {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across section workflows.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for a single LLM provider
///
/// API keys are redacted in debug output and converted to `SecretString`
/// inside each provider.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider type: "openai", "azure-openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for LLM generation
    pub temperature: f32,
    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// API base URL (custom endpoints, Azure resource endpoint)
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Azure OpenAI deployment name
    pub azure_deployment: Option<String>,
    /// Azure OpenAI API version
    pub azure_api_version: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("azure_deployment", &self.azure_deployment)
            .field("azure_api_version", &self.azure_api_version)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from_llm_config(&LlmConfig::default())
    }
}

impl ProviderConfig {
    /// Primary provider settings from the `[llm]` section
    pub fn from_llm_config(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.clone(),
            model: Some(llm.model.clone()),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: None,
            api_base: llm.api_base.clone(),
            max_tokens: llm.max_tokens,
            azure_deployment: llm.azure_deployment.clone(),
            azure_api_version: llm.azure_api_version.clone(),
        }
    }

    /// Fallback provider settings, if `[llm].fallback_provider` is set.
    ///
    /// The fallback shares timeouts and sampling settings with the primary
    /// but resolves its own endpoint and credentials.
    pub fn fallback_from_llm_config(llm: &LlmConfig) -> Option<Self> {
        let provider = llm.fallback_provider.clone()?;
        let same_provider = provider == llm.provider;
        Some(Self {
            provider,
            model: llm.fallback_model.clone(),
            timeout_secs: llm.timeout_secs,
            temperature: llm.temperature,
            api_key: None,
            api_base: if same_provider { llm.api_base.clone() } else { None },
            max_tokens: llm.max_tokens,
            azure_deployment: None,
            azure_api_version: llm.azure_api_version.clone(),
        })
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM Provider trait for structured and free-form generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate output guided by a JSON Schema.
    ///
    /// Returns the reply text untouched. Parsing and checking it against the
    /// contract is the caller's job (see `ai::structured`), so a malformed
    /// reply is never retried or handed to a fallback provider.
    async fn generate(&self, request: &ChatRequest, schema: &Value) -> Result<LlmResponse>;

    /// Generate free-form text
    async fn complete(&self, request: &ChatRequest) -> Result<LlmCompletion>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "azure-openai" | "azure" => Ok(Arc::new(OpenAiProvider::azure(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(ReportError::Config(format!(
            "Unknown provider: {}. Supported: openai, azure-openai, ollama",
            config.provider
        ))),
    }
}

/// Build the provider stack for `[llm]`: primary plus optional fallback,
/// wrapped in a retrying chain.
pub fn create_from_config(llm: &LlmConfig) -> Result<SharedProvider> {
    let primary = create_provider(&ProviderConfig::from_llm_config(llm))?;

    let mut builder = ProviderChainBuilder::new()
        .add_with_config(ChainedProvider::new(primary).with_max_retries(llm.max_retries));

    if let Some(fallback_config) = ProviderConfig::fallback_from_llm_config(llm) {
        let fallback = create_provider(&fallback_config)?;
        builder = builder
            .add_with_config(ChainedProvider::new(fallback).with_max_retries(llm.max_retries));
    }

    Ok(Arc::new(builder.build()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_fallback_config() {
        let mut llm = LlmConfig::default();
        assert!(ProviderConfig::fallback_from_llm_config(&llm).is_none());

        llm.fallback_provider = Some("ollama".to_string());
        llm.fallback_model = Some("llama3.1".to_string());
        llm.api_base = Some("https://example.openai.azure.com".to_string());
        let fallback = ProviderConfig::fallback_from_llm_config(&llm).unwrap();
        assert_eq!(fallback.provider, "ollama");
        assert_eq!(fallback.model.as_deref(), Some("llama3.1"));
        assert!(fallback.api_base.is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::from_openai(100, 50);
        assert_eq!(usage.total(), 150);
        assert_eq!(TokenUsage::from_ollama(7, 3).total(), 10);
    }
}
