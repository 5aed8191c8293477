//! Retrying Provider Chain
//!
//! Cascading provider attempts with error-category routing.
//!
//! ## Strategy
//!
//! 1. Try the current provider
//! 2. On failure, classify the error
//! 3. Rate limited: wait (retry-after hint if present) and retry
//! 4. Network / transient / malformed API envelope: exponential backoff with
//!    jitter, retry
//! 5. Auth / token limit / unavailable: move to the next provider
//! 6. Bad request: stop immediately
//!
//! The chain only sees transport failures. Reply content is parsed and
//! checked against its contract by the caller after the chain returns (see
//! `ai::structured`). A `SchemaViolation` raised inside a custom `execute`
//! closure classifies as a bad request and stops the chain.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::constants::chain as chain_constants;

use super::{ChatRequest, LlmCompletion, LlmProvider, LlmResponse, SharedProvider};
use crate::types::{ErrorCategory, ErrorClassifier, LlmError, ReportError, Result};

/// Provider with per-provider retry budget
#[derive(Clone)]
pub struct ChainedProvider {
    pub provider: SharedProvider,
    /// Retries after the first attempt on this provider
    pub max_retries: u8,
}

impl ChainedProvider {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            max_retries: chain_constants::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Configuration for the provider chain
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum total attempts across all providers
    pub max_total_attempts: usize,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_factor: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_total_attempts: chain_constants::MAX_TOTAL_ATTEMPTS,
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(chain_constants::MAX_DELAY_SECS),
            backoff_factor: chain_constants::BACKOFF_FACTOR,
        }
    }
}

/// Execution statistics for one chain call
#[derive(Debug, Default)]
pub struct ChainStats {
    pub total_attempts: usize,
    pub successful_provider: Option<String>,
    pub failures: Vec<LlmError>,
    pub total_duration_ms: u64,
}

/// What the chain should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Retry(Duration),
    NextProvider,
    Stop,
}

/// Retrying provider chain
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            providers: Vec::new(),
            config,
        }
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run `call` against the chain until one provider succeeds
    pub async fn execute<T, F, Fut>(&self, operation: &str, call: F) -> Result<(T, ChainStats)>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut stats = ChainStats::default();
        let start_time = Instant::now();

        if self.providers.is_empty() {
            return Err(ReportError::Config(
                "No providers configured in chain".to_string(),
            ));
        }

        let mut last_error: Option<ReportError> = None;

        'providers: for entry in &self.providers {
            let provider_name = entry.provider.name().to_string();
            let mut current_delay = self.config.base_delay;
            let attempts = u32::from(entry.max_retries) + 1;

            for attempt in 1..=attempts {
                if stats.total_attempts >= self.config.max_total_attempts {
                    break 'providers;
                }
                stats.total_attempts += 1;

                debug!(
                    operation,
                    provider = %provider_name,
                    attempt,
                    total_attempt = stats.total_attempts,
                    "Chain attempt"
                );

                let err = match call(Arc::clone(&entry.provider)).await {
                    Ok(value) => {
                        stats.successful_provider = Some(provider_name);
                        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
                        if stats.total_attempts > 1 {
                            info!(
                                operation,
                                attempts = stats.total_attempts,
                                "Chain succeeded after retries"
                            );
                        }
                        return Ok((value, stats));
                    }
                    Err(err) => err,
                };

                let classified = ErrorClassifier::classify_report_error(&err, &provider_name);
                warn!(
                    operation,
                    provider = %provider_name,
                    attempt,
                    category = %classified.category,
                    error = %err,
                    "Provider call failed"
                );

                let step = self.next_step(&classified, attempt < attempts, current_delay);
                stats.failures.push(classified);
                last_error = Some(err);

                match step {
                    NextStep::Retry(delay) => {
                        debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                        sleep(delay).await;
                        current_delay = calculate_backoff(
                            current_delay,
                            self.config.backoff_factor,
                            self.config.max_delay,
                        );
                    }
                    NextStep::NextProvider => {
                        info!(provider = %provider_name, "Moving to next provider");
                        continue 'providers;
                    }
                    NextStep::Stop => break 'providers,
                }
            }
        }

        debug!(
            operation,
            attempts = stats.total_attempts,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Chain exhausted"
        );
        Err(last_error
            .unwrap_or_else(|| ReportError::LlmApi("All providers in chain failed".to_string())))
    }

    /// Route a classified failure
    fn next_step(&self, error: &LlmError, can_retry: bool, current_delay: Duration) -> NextStep {
        match error.category {
            ErrorCategory::BadRequest => NextStep::Stop,
            ErrorCategory::Auth | ErrorCategory::TokenLimit | ErrorCategory::Unavailable => {
                NextStep::NextProvider
            }
            _ if !can_retry => NextStep::NextProvider,
            ErrorCategory::RateLimit => {
                let wait = error.retry_after.unwrap_or_else(|| {
                    parse_rate_limit_delay(&error.message)
                        .unwrap_or_else(|| ErrorCategory::RateLimit.recommended_delay())
                });
                NextStep::Retry(wait)
            }
            ErrorCategory::ParseError => NextStep::Retry(error.recommended_delay().min(current_delay)),
            ErrorCategory::Network | ErrorCategory::Transient | ErrorCategory::Unknown => {
                NextStep::Retry(current_delay + random_jitter(current_delay))
            }
        }
    }
}

#[async_trait]
impl LlmProvider for ProviderChain {
    async fn generate(&self, request: &ChatRequest, schema: &Value) -> Result<LlmResponse> {
        let (response, _stats) = self
            .execute("generate", move |provider: SharedProvider| async move {
                provider.generate(request, schema).await
            })
            .await?;
        Ok(response)
    }

    async fn complete(&self, request: &ChatRequest) -> Result<LlmCompletion> {
        let (completion, _stats) = self
            .execute("complete", move |provider: SharedProvider| async move {
                provider.complete(request).await
            })
            .await?;
        Ok(completion)
    }

    fn name(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider.name())
            .unwrap_or("provider-chain")
    }

    fn model(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider.model())
            .unwrap_or("unknown")
    }

    async fn health_check(&self) -> Result<bool> {
        for entry in &self.providers {
            if entry.provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Extract retry-after seconds from common rate limit messages
fn parse_rate_limit_delay(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();
    let cap = chain_constants::MAX_RATE_LIMIT_WAIT_SECS;

    for pattern in ["retry", "wait ", "in "] {
        if let Some(idx) = lower.find(pattern) {
            let secs = lower[idx + pattern.len()..]
                .split(|c: char| !c.is_ascii_digit())
                .find(|word| !word.is_empty())
                .and_then(|word| word.parse::<u64>().ok());
            if let Some(secs) = secs {
                return Some(Duration::from_secs(secs.min(cap)));
            }
        }
    }

    None
}

/// Random jitter up to a quarter of the base delay
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}

/// Exponential backoff with cap
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}

/// Builder for provider chains
pub struct ProviderChainBuilder {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChainBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    /// Add a provider with default retry settings
    pub fn add_provider(self, provider: impl LlmProvider + 'static) -> Self {
        self.add_shared(Arc::new(provider))
    }

    /// Add a shared provider with default retry settings
    pub fn add_shared(mut self, provider: SharedProvider) -> Self {
        self.providers.push(ChainedProvider::new(provider));
        self
    }

    /// Add a provider with custom retry settings
    pub fn add_with_config(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ProviderChain {
        ProviderChain {
            providers: self.providers,
            config: self.config,
        }
    }
}

impl Default for ProviderChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
