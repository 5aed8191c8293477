//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/reportforge/) and project (.reportforge/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{network, research as research_constants, search as search_constants};
use crate::types::{ReportError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Web search settings
    pub search: SearchConfig,

    /// Section research loop settings
    pub research: ResearchConfig,

    /// Document output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            research: ResearchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReportError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ReportError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ReportError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.search.timeout_secs == 0 {
            return Err(ReportError::Config(
                "Search timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.research.max_iterations == 0
            || self.research.max_iterations > research_constants::MAX_ITERATIONS
        {
            return Err(ReportError::Config(format!(
                "Research max_iterations must be between 1 and {}, got {}",
                research_constants::MAX_ITERATIONS,
                self.research.max_iterations
            )));
        }

        if self.research.max_queries == 0
            || self.research.max_queries > research_constants::MAX_QUERIES_PER_ITERATION
        {
            return Err(ReportError::Config(format!(
                "Research max_queries must be between 1 and {}, got {}",
                research_constants::MAX_QUERIES_PER_ITERATION,
                self.research.max_queries
            )));
        }

        if self.research.section_concurrency == 0 {
            return Err(ReportError::Config(
                "Research section_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.research.section_timeout_secs == Some(0) {
            return Err(ReportError::Config(
                "Research section_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        if self.output.formats.is_empty() {
            return Err(ReportError::Config(
                "Output formats must list at least one format".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai", "azure-openai", "ollama"
    pub provider: String,

    /// Model name (deployment name for Azure when `azure_deployment` is unset)
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation
    /// Default: 0.0 for repeatable drafting and judging
    pub temperature: f32,

    /// Maximum tokens to generate per call
    pub max_tokens: usize,

    /// Custom API base URL (Azure endpoint, Ollama host, OpenAI-compatible proxy)
    pub api_base: Option<String>,

    /// Azure OpenAI deployment name
    pub azure_deployment: Option<String>,

    /// Azure OpenAI API version
    pub azure_api_version: String,

    /// Retries per provider for transient failures
    pub max_retries: u8,

    /// Fallback provider for retry chain
    pub fallback_provider: Option<String>,

    /// Fallback model for retry chain
    pub fallback_model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_tokens: 4096,
            api_base: None,
            azure_deployment: None,
            azure_api_version: "2024-08-01-preview".to_string(),
            max_retries: crate::constants::chain::DEFAULT_MAX_RETRIES,
            fallback_provider: None,
            fallback_model: None,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

/// Search topic category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    #[default]
    General,
    News,
}

impl std::fmt::Display for SearchTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchTopic::General => write!(f, "general"),
            SearchTopic::News => write!(f, "news"),
        }
    }
}

impl std::str::FromStr for SearchTopic {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(SearchTopic::General),
            "news" => Ok(SearchTopic::News),
            _ => Err(format!(
                "Unknown search topic: {}. Valid values: general, news",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider name
    pub provider: String,

    /// Custom API base URL
    pub api_base: Option<String>,

    /// Per-query timeout in seconds
    pub timeout_secs: u64,

    /// Results requested per query
    pub max_results: u32,

    /// Topic category
    pub topic: SearchTopic,

    /// Recency window in days (news topic only)
    pub days: Option<u32>,

    /// Ask the provider for full page content
    pub include_raw_content: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "tavily".to_string(),
            api_base: None,
            timeout_secs: search_constants::DEFAULT_TIMEOUT_SECS,
            max_results: search_constants::DEFAULT_MAX_RESULTS,
            topic: SearchTopic::General,
            days: None,
            include_raw_content: true,
        }
    }
}

// =============================================================================
// Research Configuration
// =============================================================================

/// What to do when a section workflow fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectionFailurePolicy {
    /// Assemble the report with a placeholder noting the omission
    #[default]
    Placeholder,
    /// Fail the whole report
    Abort,
}

impl std::fmt::Display for SectionFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionFailurePolicy::Placeholder => write!(f, "placeholder"),
            SectionFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Hard cap on research iterations per section
    pub max_iterations: u32,

    /// Search queries requested per iteration (at most 5)
    pub max_queries: usize,

    /// Token budget per source in the research material
    pub max_tokens_per_source: usize,

    /// Include truncated full page content in the research material
    pub include_raw_content: bool,

    /// Section workflows running at once
    pub section_concurrency: usize,

    /// Skip web research for sections the planner marked as not needing it
    pub honor_research_flag: bool,

    /// Whole-section timeout in seconds (unset = none)
    pub section_timeout_secs: Option<u64>,

    /// Failure policy for individual sections
    pub on_section_failure: SectionFailurePolicy,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: research_constants::MAX_ITERATIONS,
            max_queries: research_constants::DEFAULT_QUERIES_PER_ITERATION,
            max_tokens_per_source: research_constants::MAX_TOKENS_PER_SOURCE,
            include_raw_content: false,
            section_concurrency: research_constants::DEFAULT_SECTION_CONCURRENCY,
            honor_research_flag: true,
            section_timeout_secs: None,
            on_section_failure: SectionFailurePolicy::Placeholder,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

/// Rendered document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!(
                "Unknown output format: {}. Valid values: markdown, html",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory
    pub dir: PathBuf,

    /// Formats to render
    pub formats: Vec<OutputFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            formats: vec![OutputFormat::Markdown, OutputFormat::Html],
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.search.timeout_secs, 40);
        assert_eq!(config.research.max_iterations, 3);
        assert!(config.research.honor_research_flag);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.research.max_queries = 6;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.research.max_iterations = 7;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.research.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.research.section_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.research.section_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("news".parse::<SearchTopic>().unwrap(), SearchTopic::News);
        assert!("weather".parse::<SearchTopic>().is_err());
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(SectionFailurePolicy::Abort.to_string(), "abort");
    }
}
