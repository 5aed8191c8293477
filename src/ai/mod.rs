//! AI Integration Layer
//!
//! LLM providers, the retrying provider chain, structured-output decoding,
//! timeouts and usage metrics.

pub mod client;
pub mod metrics;
pub mod provider;
pub mod structured;
pub mod timeout;

pub use client::LlmClient;
pub use metrics::{CallKind, MetricsCollector, MetricsSummary, SharedMetrics, create_shared_metrics};
pub use provider::{
    ChainConfig, ChainStats, ChainedProvider, ChatRequest, ErrorCategory, ErrorClassifier,
    LlmCompletion, LlmError, LlmProvider, LlmResponse, OllamaProvider, OpenAiFlavor,
    OpenAiProvider, ProviderChain, ProviderChainBuilder, ProviderConfig, ResponseMetadata,
    ResponseTiming, SharedProvider, TokenUsage, create_from_config, create_provider,
};
pub use structured::{OutputContract, decode_contract, extract_json, generate_typed};
pub use timeout::{with_timeout, with_timeout_map};
