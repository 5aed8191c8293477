//! Pipeline Metrics Collection
//!
//! Counts LLM usage and search activity across a report run.
//! Thread-safe for concurrent section workflows.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::ai::provider::TokenUsage;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Lock-free counters for one report run
pub struct MetricsCollector {
    run_id: String,
    start_time: Instant,
    structured_calls: AtomicU32,
    free_form_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    search_queries: AtomicU32,
    degraded_searches: AtomicU32,
}

/// Snapshot of a run's metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub llm_calls: u32,
    pub structured_calls: u32,
    pub free_form_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub search_queries: u32,
    pub degraded_searches: u32,
}

/// Kind of LLM call, for per-shape counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Structured,
    FreeForm,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
            structured_calls: AtomicU32::new(0),
            free_form_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            search_queries: AtomicU32::new(0),
            degraded_searches: AtomicU32::new(0),
        }
    }

    /// Record one completed LLM call
    pub fn record_llm_call(&self, kind: CallKind, usage: &TokenUsage, latency_ms: u64) {
        match kind {
            CallKind::Structured => self.structured_calls.fetch_add(1, Ordering::Relaxed),
            CallKind::FreeForm => self.free_form_calls.fetch_add(1, Ordering::Relaxed),
        };
        self.input_tokens
            .fetch_add(u64::from(usage.input_tokens), Ordering::Relaxed);
        self.output_tokens
            .fetch_add(u64::from(usage.output_tokens), Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record one search query; `degraded` when it produced no result
    pub fn record_search(&self, degraded: bool) {
        self.search_queries.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_searches.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn summary(&self) -> MetricsSummary {
        let structured_calls = self.structured_calls.load(Ordering::Relaxed);
        let free_form_calls = self.free_form_calls.load(Ordering::Relaxed);
        let llm_calls = structured_calls + free_form_calls;
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if llm_calls > 0 {
            total_latency as f64 / f64::from(llm_calls)
        } else {
            0.0
        };

        MetricsSummary {
            run_id: self.run_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            llm_calls,
            structured_calls,
            free_form_calls,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms,
            search_queries: self.search_queries.load(Ordering::Relaxed),
            degraded_searches: self.degraded_searches.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             LLM Calls: {} (structured: {}, free-form: {})\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms\n\
             Searches: {} ({} degraded)",
            self.run_id,
            self.total_duration_ms as f64 / 1000.0,
            self.llm_calls,
            self.structured_calls,
            self.free_form_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
            self.search_queries,
            self.degraded_searches
        )
    }
}

/// Shared metrics collector for pipeline stages
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(run_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(run_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_calls() {
        let metrics = MetricsCollector::new("run-1");
        metrics.record_llm_call(CallKind::Structured, &TokenUsage::from_openai(100, 50), 400);
        metrics.record_llm_call(CallKind::FreeForm, &TokenUsage::from_openai(10, 5), 200);

        let summary = metrics.summary();
        assert_eq!(summary.llm_calls, 2);
        assert_eq!(summary.structured_calls, 1);
        assert_eq!(summary.total_tokens, 165);
        assert!((summary.avg_latency_ms - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_search_recording() {
        let metrics = create_shared_metrics("concurrent");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let m = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        m.record_search(i % 2 == 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.search_queries, 400);
        assert_eq!(summary.degraded_searches, 200);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-run");
        metrics.record_search(true);
        let display = metrics.summary().display();
        assert!(display.contains("display-run"));
        assert!(display.contains("1 degraded"));
    }
}
