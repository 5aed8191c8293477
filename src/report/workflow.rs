//! Section Research Workflow
//!
//! Per-section state machine:
//!
//! ```text
//! RESEARCHING → EVALUATING → { RESEARCHING | FINALIZING } → DONE
//! ```
//!
//! Each research step generates queries, searches, aggregates the results
//! and appends a new draft to the section. The evaluator then decides
//! whether to loop. The loop is capped at `max_iterations` regardless of
//! the evaluator, after which the final reviewer approves or rewrites.

use tracing::{debug, info, instrument, warn};

use super::{prompts, schemas};
use crate::ai::LlmClient;
use crate::config::ResearchConfig;
use crate::constants::research::{MAX_ITERATIONS, MAX_QUERIES_PER_ITERATION};
use crate::search::{ResultAggregator, SearchClient};
use crate::types::{
    CompletedSection, Feedback, FinalReview, ReportError, Result, SearchQuerySet, Section,
};

/// Mutable state owned by one workflow run
#[derive(Debug, Clone)]
pub struct ResearchWorkflowState {
    pub section: Section,
    /// Every query issued so far, in order
    pub queries: Vec<String>,
    /// Latest evaluator output
    pub feedback: Option<Feedback>,
    /// Research steps taken; incremented at the top of each step
    pub iteration: u32,
}

impl ResearchWorkflowState {
    pub fn new(section: Section) -> Self {
        Self {
            section,
            queries: Vec::new(),
            feedback: None,
            iteration: 0,
        }
    }

    fn feedback_reasoning(&self) -> &str {
        self.feedback
            .as_ref()
            .map(|f| f.reasoning.as_str())
            .unwrap_or("")
    }
}

/// Where the loop goes after an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Research,
    Finalize,
}

/// Continue only on an explicit request while under the iteration cap
pub fn route(feedback: &Feedback, iteration: u32, max_iterations: u32) -> Route {
    if feedback.wants_more_research() && iteration < max_iterations {
        Route::Research
    } else {
        Route::Finalize
    }
}

pub struct SectionResearchWorkflow<'a> {
    llm: &'a LlmClient,
    search: &'a SearchClient,
    config: &'a ResearchConfig,
    aggregator: ResultAggregator,
    topic: &'a str,
}

impl<'a> SectionResearchWorkflow<'a> {
    pub fn new(
        llm: &'a LlmClient,
        search: &'a SearchClient,
        config: &'a ResearchConfig,
        topic: &'a str,
    ) -> Self {
        Self {
            llm,
            search,
            config,
            aggregator: ResultAggregator::new(
                config.max_tokens_per_source,
                config.include_raw_content,
            ),
            topic,
        }
    }

    /// Run the section to completion. Failures come back as `ReportError::Section`.
    #[instrument(skip(self, section), fields(section = %section.name))]
    pub async fn run(&self, section: Section) -> Result<CompletedSection> {
        let name = section.name.clone();
        self.run_inner(section)
            .await
            .map_err(|e| ReportError::section(name, e))
    }

    async fn run_inner(&self, section: Section) -> Result<CompletedSection> {
        let mut state = ResearchWorkflowState::new(section);

        // A config built without validation still cannot loop past the hard cap
        let max_iterations = self.config.max_iterations.min(MAX_ITERATIONS);

        if self.config.honor_research_flag && !state.section.requires_research {
            debug!("Research not required; drafting from description");
            self.draft(&mut state, "").await?;
        } else {
            loop {
                self.research_step(&mut state).await?;

                let feedback = self.evaluate(&state.section).await?;
                let next = route(&feedback, state.iteration, max_iterations);
                debug!(
                    iteration = state.iteration,
                    verdict = %feedback.verdict,
                    route = ?next,
                    "Section evaluated"
                );
                state.feedback = Some(feedback);

                if next == Route::Finalize {
                    if state
                        .feedback
                        .as_ref()
                        .is_some_and(Feedback::wants_more_research)
                    {
                        info!(
                            iterations = state.iteration,
                            "Iteration cap reached; finalizing with current content"
                        );
                    }
                    break;
                }
            }
        }

        self.finalize(state).await
    }

    /// One RESEARCHING pass: queries, search, aggregate, draft
    pub async fn research_step(&self, state: &mut ResearchWorkflowState) -> Result<()> {
        state.iteration += 1;

        let queries = self.generate_queries(state).await?;
        if queries.is_empty() {
            debug!(iteration = state.iteration, "No search queries generated");
        }

        let responses = self.search.search_all(&queries.queries).await;
        if responses.len() < queries.len() {
            warn!(
                iteration = state.iteration,
                succeeded = responses.len(),
                issued = queries.len(),
                "Some searches degraded"
            );
        }
        let material = self.aggregator.aggregate(&responses);
        state.queries.extend(queries.queries);

        self.draft(state, &material).await
    }

    async fn generate_queries(&self, state: &ResearchWorkflowState) -> Result<SearchQuerySet> {
        let max = self.config.max_queries.min(MAX_QUERIES_PER_ITERATION);
        let request =
            prompts::query_generation(self.topic, &state.section, state.feedback_reasoning(), max);
        let generated: SearchQuerySet = self
            .llm
            .structured(&schemas::search_queries(), &request)
            .await?;

        if generated.len() > max {
            debug!(generated = generated.len(), max, "Query set truncated");
        }
        Ok(generated.normalized(max))
    }

    /// Draft from research material and append to the section
    async fn draft(&self, state: &mut ResearchWorkflowState, material: &str) -> Result<()> {
        let request = prompts::section_writing(self.topic, &state.section, material);
        let draft = self.llm.complete(&request, "section_writing").await?;
        state.section.append(&draft);
        Ok(())
    }

    async fn evaluate(&self, section: &Section) -> Result<Feedback> {
        let request = prompts::research_feedback(self.topic, section);
        self.llm
            .structured(&schemas::research_feedback(), &request)
            .await
    }

    async fn finalize(&self, mut state: ResearchWorkflowState) -> Result<CompletedSection> {
        let request = prompts::final_review(self.topic, &state.section);
        let review: FinalReview = self
            .llm
            .structured(&schemas::final_review(), &request)
            .await?;
        review.outcome.apply(&mut state.section);

        info!(
            iterations = state.iteration,
            queries = state.queries.len(),
            approved = review.outcome.is_approved(),
            "Section finalized"
        );

        Ok(CompletedSection {
            section: state.section,
            iterations: state.iteration,
            queries: state.queries,
            review: review.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::report::testing::ScriptedLlm;
    use crate::search::testing::{ScriptedSearch, result};
    use crate::types::{ResearchVerdict, ReviewOutcome};
    use std::sync::Arc;

    fn search() -> (SearchClient, Arc<ScriptedSearch>) {
        let provider = Arc::new(ScriptedSearch::always(vec![result(
            "Fixed",
            "https://fixed.example",
            "fixed excerpt",
        )]));
        (
            SearchClient::new(provider.clone(), &SearchConfig::default()),
            provider,
        )
    }

    fn feedback(verdict: ResearchVerdict) -> Feedback {
        Feedback {
            reasoning: String::new(),
            verdict,
        }
    }

    #[test]
    fn test_route_respects_cap() {
        let more = feedback(ResearchVerdict::ContinueResearch);
        assert_eq!(route(&more, 1, 3), Route::Research);
        assert_eq!(route(&more, 2, 3), Route::Research);
        assert_eq!(route(&more, 3, 3), Route::Finalize);
        assert_eq!(route(&feedback(ResearchVerdict::Finalize), 1, 3), Route::Finalize);
    }

    #[tokio::test]
    async fn test_always_continue_stops_at_cap() {
        let (llm, provider, _) = ScriptedLlm {
            verdict: "continue_research",
            ..Default::default()
        }
        .into_client();
        let (search, _) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "X vs Y");

        let done = workflow
            .run(Section::new("Features", "Compare", true))
            .await
            .unwrap();

        assert_eq!(done.iterations, 3);
        assert_eq!(provider.calls_of("queries").len(), 3);
        assert_eq!(provider.calls_of("feedback").len(), 3);
        assert_eq!(provider.calls_of("review").len(), 1);
        assert_eq!(done.section.content, "drafteddrafteddrafted");
        assert_eq!(done.queries.len(), 6);
    }

    #[tokio::test]
    async fn test_oversized_iteration_limit_is_clamped() {
        let (llm, provider, _) = ScriptedLlm {
            verdict: "continue_research",
            ..Default::default()
        }
        .into_client();
        let (search, _) = search();
        let config = ResearchConfig {
            max_iterations: 7,
            ..ResearchConfig::default()
        };
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "X vs Y");

        let done = workflow
            .run(Section::new("Features", "Compare", true))
            .await
            .unwrap();

        assert_eq!(done.iterations, MAX_ITERATIONS);
        assert_eq!(provider.calls_of("feedback").len(), 3);
    }

    #[tokio::test]
    async fn test_draft_appends() {
        let (llm, _, _) = ScriptedLlm::default().draft("Features", "B").into_client();
        let (search, _) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "X vs Y");

        let mut section = Section::new("Features", "Compare", true);
        section.append("A");
        let mut state = ResearchWorkflowState::new(section);
        workflow.research_step(&mut state).await.unwrap();

        assert_eq!(state.section.content, "AB");
        assert_eq!(state.iteration, 1);
        assert_eq!(state.queries, ["query one", "query two"]);
    }

    #[tokio::test]
    async fn test_finalize_on_first_pass() {
        let (llm, provider, _) = ScriptedLlm::default().draft("Features", "text").into_client();
        let (search, seen) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "X vs Y");

        let done = workflow
            .run(Section::new("Features", "Compare", true))
            .await
            .unwrap();

        assert_eq!(done.iterations, 1);
        assert_eq!(done.review, ReviewOutcome::Approved);
        assert_eq!(done.section.content, "text");
        assert_eq!(seen.seen_queries().len(), 2);
        assert_eq!(provider.calls_of("draft"), ["Features"]);
    }

    #[tokio::test]
    async fn test_rewrite_replaces_content() {
        let (llm, _, _) = ScriptedLlm {
            review_answer: "## Features\n\nPolished".to_string(),
            ..Default::default()
        }
        .into_client();
        let (search, _) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "t");

        let done = workflow.run(Section::new("Features", "f", true)).await.unwrap();
        assert_eq!(done.section.content, "## Features\n\nPolished");
        assert!(!done.review.is_approved());
    }

    #[tokio::test]
    async fn test_non_research_section_skips_search() {
        let (llm, provider, _) = ScriptedLlm::default().into_client();
        let (search, seen) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "t");

        let done = workflow
            .run(Section::new("Summary", "Recap", false))
            .await
            .unwrap();

        assert_eq!(done.iterations, 0);
        assert!(done.queries.is_empty());
        assert!(seen.seen_queries().is_empty());
        assert!(provider.calls_of("queries").is_empty());
        assert!(provider.calls_of("feedback").is_empty());
        assert_eq!(provider.calls_of("review").len(), 1);
    }

    #[tokio::test]
    async fn test_research_flag_ignored_when_disabled() {
        let (llm, _, _) = ScriptedLlm::default().into_client();
        let (search, seen) = search();
        let config = ResearchConfig {
            honor_research_flag: false,
            ..ResearchConfig::default()
        };
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "t");

        let done = workflow
            .run(Section::new("Summary", "Recap", false))
            .await
            .unwrap();
        assert_eq!(done.iterations, 1);
        assert!(!seen.seen_queries().is_empty());
    }

    #[tokio::test]
    async fn test_evaluator_contract_violation_fails_section() {
        let mut llm = ScriptedLlm::default();
        llm.broken_feedback.insert("Features".to_string());
        let (llm, _, _) = llm.into_client();
        let (search, _) = search();
        let config = ResearchConfig::default();
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "t");

        let err = workflow
            .run(Section::new("Features", "f", true))
            .await
            .unwrap_err();
        assert!(matches!(&err, ReportError::Section { section, .. } if section == "Features"));
        assert!(err.is_schema_violation());
    }

    #[tokio::test]
    async fn test_query_set_capped() {
        let (llm, _, _) = ScriptedLlm {
            queries: (0..8).map(|i| format!("q{}", i)).collect(),
            ..Default::default()
        }
        .into_client();
        let (search, seen) = search();
        let config = ResearchConfig {
            max_queries: 3,
            ..ResearchConfig::default()
        };
        let workflow = SectionResearchWorkflow::new(&llm, &search, &config, "t");

        let done = workflow.run(Section::new("A", "a", true)).await.unwrap();
        assert_eq!(done.queries, ["q0", "q1", "q2"]);
        assert_eq!(seen.seen_queries().len(), 3);
    }
}
