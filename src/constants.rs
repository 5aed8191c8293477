//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Section research loop constants
pub mod research {
    /// Hard cap on research iterations per section
    pub const MAX_ITERATIONS: u32 = 3;

    /// Search queries requested from the LLM per iteration
    pub const DEFAULT_QUERIES_PER_ITERATION: usize = 4;

    /// Upper bound on queries accepted per iteration
    pub const MAX_QUERIES_PER_ITERATION: usize = 5;

    /// Token budget per source when raw content is included
    pub const MAX_TOKENS_PER_SOURCE: usize = 1000;

    /// Characters per token used to turn a token budget into a character cap
    pub const CHARS_PER_TOKEN: usize = 4;

    /// Concurrent section workflows
    pub const DEFAULT_SECTION_CONCURRENCY: usize = 4;
}

/// Web search constants
pub mod search {
    /// Per-query timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 40;

    /// Results requested per query
    pub const DEFAULT_MAX_RESULTS: u32 = 5;

    /// Tavily API base URL
    pub const TAVILY_API_BASE: &str = "https://api.tavily.com";
}

/// Provider chain constants
pub mod chain {
    /// Maximum total attempts across all providers
    pub const MAX_TOTAL_ATTEMPTS: usize = 6;

    /// Default maximum retries per provider
    pub const DEFAULT_MAX_RETRIES: u8 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Longest rate-limit wait honored from a provider message (seconds)
    pub const MAX_RATE_LIMIT_WAIT_SECS: u64 = 300;
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}

/// Report markup conventions shared by prompts and the renderer
pub mod markup {
    /// Heading text that opens a references block
    pub const SOURCES_HEADING: &str = "Sources";

    /// Marker appended to truncated source content
    pub const TRUNCATION_MARKER: &str = "... [truncated]";
}
