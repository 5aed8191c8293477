//! Scripted LLM provider shared by the report tests
//!
//! Routes each call by what it asks for: structured calls by the schema's
//! required fields, free-form calls by the user command. Per-section
//! behavior is keyed by the section name found in the system prompt.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::ai::{
    ChatRequest, LlmClient, LlmCompletion, LlmProvider, LlmResponse, SharedMetrics,
    create_shared_metrics,
};
use crate::types::{ReportError, Result, Section};

const SECTION_MARKERS: [&str; 4] = [
    "The section to research:\n\n",
    "The section to write:\n\n",
    "The section under review:\n\n",
    "The section:\n\n",
];

fn section_name(system: &str) -> String {
    SECTION_MARKERS
        .iter()
        .find_map(|marker| system.split_once(marker))
        .and_then(|(_, rest)| rest.lines().next())
        .unwrap_or_default()
        .to_string()
}

fn required_fields(schema: &Value) -> Vec<&str> {
    schema["required"]
        .as_array()
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub struct ScriptedLlm {
    pub plan: Vec<Section>,
    pub queries: Vec<String>,
    /// Draft text per section; `default_draft` otherwise
    pub drafts: HashMap<String, String>,
    pub default_draft: String,
    /// Evaluator verdict for every section
    pub verdict: &'static str,
    /// Final reviewer answer for every section
    pub review_answer: String,
    /// Sections whose evaluator returns an out-of-contract verdict
    pub broken_feedback: HashSet<String>,
    /// Sections whose drafting call never returns
    pub hanging_drafts: HashSet<String>,
    /// Every call as `kind:section`, in arrival order
    pub calls: Mutex<Vec<String>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            plan: Vec::new(),
            queries: vec!["query one".to_string(), "query two".to_string()],
            drafts: HashMap::new(),
            default_draft: "drafted".to_string(),
            verdict: "finalize",
            review_answer: "approved".to_string(),
            broken_feedback: HashSet::new(),
            hanging_drafts: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLlm {
    pub fn with_plan(sections: &[(&str, bool)]) -> Self {
        Self {
            plan: sections
                .iter()
                .map(|(name, research)| Section::new(*name, format!("About {}", name), *research))
                .collect(),
            ..Default::default()
        }
    }

    pub fn draft(mut self, section: &str, text: &str) -> Self {
        self.drafts.insert(section.to_string(), text.to_string());
        self
    }

    pub fn calls_of(&self, kind: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| call.strip_prefix(&format!("{}:", kind)).map(String::from))
            .collect()
    }

    fn record(&self, kind: &str, section: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", kind, section));
    }

    pub fn into_client(self) -> (LlmClient, Arc<ScriptedLlm>, SharedMetrics) {
        let provider = Arc::new(self);
        let metrics = create_shared_metrics("report-test");
        let client = LlmClient::new(provider.clone(), metrics.clone(), Duration::from_secs(5));
        (client, provider, metrics)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, request: &ChatRequest, schema: &Value) -> Result<LlmResponse> {
        let section = section_name(&request.system);
        let fields = required_fields(schema);

        let content = if fields.contains(&"sections") {
            self.record("plan", "");
            json!({ "sections": self.plan })
        } else if fields.contains(&"queries") {
            self.record("queries", &section);
            json!({ "queries": self.queries })
        } else if fields.contains(&"verdict") {
            self.record("feedback", &section);
            if self.broken_feedback.contains(&section) {
                json!({ "reasoning": "unsure", "verdict": "maybe" })
            } else {
                json!({ "reasoning": "looks fine", "verdict": self.verdict })
            }
        } else if fields.contains(&"answer") {
            self.record("review", &section);
            json!({ "reasoning": "checked", "answer": self.review_answer })
        } else {
            return Err(ReportError::LlmApi(format!("unscripted schema: {}", schema)));
        };

        Ok(LlmResponse::content_only(content.to_string()))
    }

    async fn complete(&self, request: &ChatRequest) -> Result<LlmCompletion> {
        let text = match request.user.as_str() {
            "Please write the introduction." => {
                self.record("introduction", "");
                "# X vs Y\n\n## Introduction\n\nIntro text".to_string()
            }
            "Please write the conclusion." => {
                self.record("conclusion", "");
                "## Conclusion\n\nConclusion text".to_string()
            }
            _ => {
                let section = section_name(&request.system);
                self.record("draft", &section);
                if self.hanging_drafts.contains(&section) {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                self.drafts
                    .get(&section)
                    .cloned()
                    .unwrap_or_else(|| self.default_draft.clone())
            }
        };
        Ok(LlmCompletion::text_only(text))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
