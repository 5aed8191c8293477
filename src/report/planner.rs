//! Section Planner
//!
//! Single structured call turning topic + outline into ordered section specs.
//! A reply that is not JSON or breaks the plan contract is fatal to the
//! report. Only transport failures are retried, inside the provider chain.

use tracing::{info, instrument};

use super::{prompts, schemas};
use crate::ai::LlmClient;
use crate::types::{ReportError, Result, Section, SectionPlan};

pub struct SectionPlanner<'a> {
    llm: &'a LlmClient,
}

impl<'a> SectionPlanner<'a> {
    pub fn new(llm: &'a LlmClient) -> Self {
        Self { llm }
    }

    #[instrument(skip(self, outline), fields(outline_len = outline.len()))]
    pub async fn plan(&self, topic: &str, outline: &str) -> Result<Vec<Section>> {
        let request = prompts::section_planning(topic, outline);
        let plan: SectionPlan = self
            .llm
            .structured(&schemas::section_plan(), &request)
            .await
            .map_err(ReportError::planning)?;

        let sections: Vec<Section> = plan
            .sections
            .into_iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|mut s| {
                // Content is always drafted from scratch
                s.content.clear();
                s
            })
            .collect();

        if sections.is_empty() {
            return Err(ReportError::planning(ReportError::schema_violation(
                "section_plan",
                "planner returned no sections",
            )));
        }

        info!(
            sections = sections.len(),
            research = sections.iter().filter(|s| s.requires_research).count(),
            "Report planned"
        );
        Ok(sections)
    }
}
