//! LLM Client
//!
//! The handle pipeline stages use for model calls. It is built once at
//! process start and shared by reference. Every call gets a timeout and
//! metrics recording. Structured calls are also decoded against their
//! contract.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::metrics::{CallKind, SharedMetrics};
use super::provider::{ChatRequest, SharedProvider};
use super::structured::{OutputContract, generate_typed};
use super::timeout::with_timeout;
use crate::types::Result;

#[derive(Clone)]
pub struct LlmClient {
    provider: SharedProvider,
    metrics: SharedMetrics,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(provider: SharedProvider, metrics: SharedMetrics, timeout: Duration) -> Self {
        Self {
            provider,
            metrics,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Structured call decoded into the contract type `T`
    pub async fn structured<T: DeserializeOwned>(
        &self,
        contract: &OutputContract,
        request: &ChatRequest,
    ) -> Result<T> {
        let start = Instant::now();
        let (value, usage) = with_timeout(
            self.timeout,
            generate_typed::<T>(self.provider.as_ref(), request, contract),
            contract.name,
        )
        .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        self.metrics
            .record_llm_call(CallKind::Structured, &usage, latency_ms);
        debug!(
            contract = contract.name,
            tokens = usage.total(),
            latency_ms,
            "Structured call decoded"
        );
        Ok(value)
    }

    /// Free-form text call
    pub async fn complete(&self, request: &ChatRequest, operation: &str) -> Result<String> {
        let start = Instant::now();
        let completion = with_timeout(self.timeout, self.provider.complete(request), operation).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        self.metrics
            .record_llm_call(CallKind::FreeForm, &completion.usage, latency_ms);
        debug!(
            operation,
            tokens = completion.usage.total(),
            latency_ms,
            "Free-form call completed"
        );
        Ok(completion.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::metrics::create_shared_metrics;
    use crate::ai::provider::{LlmCompletion, LlmProvider, LlmResponse, TokenUsage};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct FixedProvider {
        json: Value,
        delay: Duration,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(&self, _request: &ChatRequest, _schema: &Value) -> Result<LlmResponse> {
            tokio::time::sleep(self.delay).await;
            let mut response = LlmResponse::content_only(self.json.to_string());
            response.usage = TokenUsage::from_openai(12, 3);
            Ok(response)
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<LlmCompletion> {
            tokio::time::sleep(self.delay).await;
            Ok(LlmCompletion::text_only("drafted"))
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[derive(Debug, Deserialize)]
    struct Verdict {
        verdict: String,
    }

    fn client(json: Value, delay: Duration, timeout: Duration) -> LlmClient {
        LlmClient::new(
            Arc::new(FixedProvider { json, delay }),
            create_shared_metrics("test"),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_structured_records_metrics() {
        let client = client(json!({"verdict": "finalize"}), Duration::ZERO, Duration::from_secs(1));
        let contract = OutputContract::new("verdict", json!({}));
        let decoded: Verdict = client
            .structured(&contract, &ChatRequest::new("s", "u"))
            .await
            .unwrap();
        assert_eq!(decoded.verdict, "finalize");

        let summary = client.metrics().summary();
        assert_eq!(summary.structured_calls, 1);
        assert_eq!(summary.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_structured_contract_violation() {
        let client = client(json!({"other": 1}), Duration::ZERO, Duration::from_secs(1));
        let contract = OutputContract::new("verdict", json!({}));
        let err = client
            .structured::<Verdict>(&contract, &ChatRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(err.is_schema_violation());
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let client = client(json!({}), Duration::from_secs(1), Duration::from_millis(10));
        let err = client
            .complete(&ChatRequest::new("s", "u"), "draft")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::types::ReportError::Timeout { .. }));
        assert_eq!(client.metrics().summary().llm_calls, 0);
    }
}
