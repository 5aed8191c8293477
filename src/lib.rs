//! reportforge - AI-Driven Research Report Generator
//!
//! Turns a topic and an outline into a researched, multi-section report.
//! Each planned section runs its own bounded research loop (query
//! generation, web search, drafting, LLM review) and the sections are
//! researched concurrently before an introduction and conclusion frame
//! the final document.
//!
//! ## Core Features
//!
//! - **Section Research Loop**: capped query → search → draft → evaluate cycle
//! - **Fan-out Isolation**: a failing section becomes a placeholder, not a crash
//! - **Provider Chain**: OpenAI, Azure OpenAI and Ollama with retry and fallback
//! - **Structured Output**: typed contracts for every judged LLM call
//!
//! ## Quick Start
//!
//! ```ignore
//! use reportforge::{ConfigLoader, LlmClient, ReportPipeline, SearchClient};
//!
//! let config = ConfigLoader::load()?;
//! let metrics = create_shared_metrics("run");
//! let llm = LlmClient::new(create_from_config(&config.llm)?, metrics.clone(), timeout);
//! let search = SearchClient::new(create_search_provider(&config.search)?, &config.search);
//! let report = ReportPipeline::new(llm, search, config.research)
//!     .generate("Rust vs Go", outline)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: LLM providers, provider chain, structured output, metrics
//! - [`search`]: search providers, degrading search client, result aggregation
//! - [`report`]: planner, section workflow and the report pipeline
//! - [`render`]: markdown and print-ready HTML output
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod render;
pub mod report;
pub mod search;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorCategory, ReportError, Result};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use report::{Report, ReportPipeline, SectionPlanner, SectionResearchWorkflow};
pub use search::{ResultAggregator, SearchClient, SearchProvider};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    LlmClient, LlmProvider, MetricsCollector, ProviderChain, ProviderChainBuilder, SharedMetrics,
    create_from_config, create_shared_metrics,
};
