//! Report Pipeline
//!
//! Topic + outline in, assembled document out:
//!
//! 1. **Plan**: `SectionPlanner` turns the outline into ordered sections
//! 2. **Fan out**: one `SectionResearchWorkflow` per section, bounded by
//!    `section_concurrency`
//! 3. **Fan in**: results re-sorted by plan index, joined into the body
//! 4. **Frame**: introduction and conclusion generated concurrently
//! 5. **Assemble**: introduction, body, conclusion
//!
//! A failing section never takes its siblings down. Depending on
//! `on_section_failure` it is either replaced by a placeholder (report
//! marked incomplete) or aborts the whole report.

mod planner;
pub mod prompts;
pub mod schemas;
mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use planner::SectionPlanner;
pub use workflow::{ResearchWorkflowState, Route, SectionResearchWorkflow, route};

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ai::{LlmClient, with_timeout_map};
use crate::config::{ResearchConfig, SectionFailurePolicy};
use crate::search::SearchClient;
use crate::types::{CompletedSection, ReportError, Result, Section};
use prompts::Framing;

/// Section that did not complete, kept in the report as a placeholder
#[derive(Debug, Clone, Serialize)]
pub struct FailedSection {
    /// Position in the plan
    pub index: usize,
    pub name: String,
    pub error: String,
}

impl FailedSection {
    /// Placeholder block standing in for the section in the body
    pub fn placeholder(&self) -> String {
        format!(
            "## {}\n\n*Research incomplete: this section could not be generated ({}).*",
            self.name, self.error
        )
    }
}

/// Assembled report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub topic: String,
    /// Completed sections in plan order
    pub sections: Vec<CompletedSection>,
    /// Sections replaced by placeholders, in plan order
    pub failed: Vec<FailedSection>,
    pub introduction: String,
    pub body: String,
    pub conclusion: String,
    pub document: String,
}

impl Report {
    /// False when any section was replaced by a placeholder
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_queries(&self) -> usize {
        self.sections.iter().map(|s| s.queries.len()).sum()
    }
}

enum SectionOutcome {
    Done(CompletedSection),
    Failed(FailedSection),
}

/// Orchestrates planning, per-section research and assembly.
///
/// Clients are injected once and shared by every section workflow.
pub struct ReportPipeline {
    llm: LlmClient,
    search: SearchClient,
    config: ResearchConfig,
}

impl ReportPipeline {
    pub fn new(llm: LlmClient, search: SearchClient, config: ResearchConfig) -> Self {
        Self {
            llm,
            search,
            config,
        }
    }

    /// Planning stage only
    pub async fn plan(&self, topic: &str, outline: &str) -> Result<Vec<Section>> {
        SectionPlanner::new(&self.llm).plan(topic, outline).await
    }

    /// Run the whole pipeline
    #[instrument(skip(self, outline))]
    pub async fn generate(&self, topic: &str, outline: &str) -> Result<Report> {
        let planned = self.plan(topic, outline).await?;
        info!(
            "Researching {} sections (concurrency={})",
            planned.len(),
            self.config.section_concurrency
        );

        let outcomes = self.research_sections(topic, planned).await?;

        let mut sections = Vec::new();
        let mut failed = Vec::new();
        let mut blocks = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                SectionOutcome::Done(done) => {
                    blocks.push(done.section.content.clone());
                    sections.push(done);
                }
                SectionOutcome::Failed(fail) => {
                    blocks.push(fail.placeholder());
                    failed.push(fail);
                }
            }
        }
        let body = blocks.join("\n\n");

        let (introduction, conclusion) = self.frame(topic, &body).await?;
        let document = format!("{}\n\n{}\n\n{}", introduction, body, conclusion);

        info!(
            completed = sections.len(),
            failed = failed.len(),
            "Report assembled"
        );

        Ok(Report {
            topic: topic.to_string(),
            sections,
            failed,
            introduction,
            body,
            conclusion,
            document,
        })
    }

    /// Fan out section workflows and collect outcomes in plan order
    async fn research_sections(
        &self,
        topic: &str,
        sections: Vec<Section>,
    ) -> Result<Vec<SectionOutcome>> {
        let section_timeout = self.config.section_timeout_secs.map(Duration::from_secs);
        let total = sections.len();

        let mut stream = futures::stream::iter(sections.into_iter().enumerate())
            .map(|(index, section)| async move {
                let name = section.name.clone();
                let workflow =
                    SectionResearchWorkflow::new(&self.llm, &self.search, &self.config, topic);

                // Dropping the workflow future on expiry cancels its in-flight searches
                let result = match section_timeout {
                    Some(limit) => {
                        match with_timeout_map(limit, workflow.run(section), "section research")
                            .await
                        {
                            Ok(result) => result,
                            Err(timeout) => Err(ReportError::section(name.clone(), timeout)),
                        }
                    }
                    None => workflow.run(section).await,
                };
                (index, name, result)
            })
            .buffer_unordered(self.config.section_concurrency.max(1));

        let mut outcomes = Vec::with_capacity(total);
        while let Some((index, name, result)) = stream.next().await {
            match result {
                Ok(done) => outcomes.push((index, SectionOutcome::Done(done))),
                Err(e) => {
                    if self.config.on_section_failure == SectionFailurePolicy::Abort {
                        warn!(section = %name, error = %e, "Section failed; aborting report");
                        return Err(e);
                    }
                    warn!(section = %name, error = %e, "Section failed; inserting placeholder");
                    let error = match e {
                        ReportError::Section { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    outcomes.push((
                        index,
                        SectionOutcome::Failed(FailedSection { index, name, error }),
                    ));
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Introduction and conclusion, generated concurrently from the body
    async fn frame(&self, topic: &str, body: &str) -> Result<(String, String)> {
        let intro_request = prompts::framing_section(topic, body, Framing::Introduction);
        let conclusion_request = prompts::framing_section(topic, body, Framing::Conclusion);

        let (introduction, conclusion) = tokio::join!(
            self.llm.complete(&intro_request, "introduction"),
            self.llm.complete(&conclusion_request, "conclusion"),
        );
        Ok((introduction?, conclusion?))
    }
}
