//! Report Data Model
//!
//! Sections, structured-output contracts, and the per-iteration judge
//! decisions that drive the section research loop.

use serde::{Deserialize, Serialize};

// =============================================================================
// Section
// =============================================================================

/// One named, researchable unit of the final report.
///
/// `content` accumulates across research iterations (append-only) until the
/// finalize step, which may replace it wholesale with a revised version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Name of this section of the report
    pub name: String,
    /// Brief overview of the main topics and concepts to be covered
    pub description: String,
    /// Whether to perform web research for this section
    #[serde(rename = "research", alias = "requires_research")]
    pub requires_research: bool,
    /// Content of this section (empty until drafted)
    #[serde(default)]
    pub content: String,
}

impl Section {
    pub fn new(name: impl Into<String>, description: impl Into<String>, research: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_research: research,
            content: String::new(),
        }
    }

    /// Append drafted material to the section content
    pub fn append(&mut self, draft: &str) {
        self.content.push_str(draft);
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Planner contract: ordered list of sections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionPlan {
    pub sections: Vec<Section>,
}

/// Query generation contract: ordered search queries for one iteration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuerySet {
    #[serde(default)]
    pub queries: Vec<String>,
}

impl SearchQuerySet {
    /// Drop blank queries and cap the set at `max` entries, preserving order
    pub fn normalized(self, max: usize) -> Self {
        let queries = self
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(max)
            .collect();
        Self { queries }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }
}

// =============================================================================
// Judge Decisions
// =============================================================================

/// Evaluator verdict controlling loop routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchVerdict {
    ContinueResearch,
    Finalize,
}

impl std::fmt::Display for ResearchVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContinueResearch => write!(f, "continue_research"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}

/// Evaluator output for one research iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(alias = "thought_process")]
    pub reasoning: String,
    #[serde(alias = "answer")]
    pub verdict: ResearchVerdict,
}

impl Feedback {
    pub fn wants_more_research(&self) -> bool {
        self.verdict == ResearchVerdict::ContinueResearch
    }
}

/// Literal the final reviewer returns when a section needs no rewrite
pub const APPROVED_LITERAL: &str = "approved";

/// Outcome of the final review of a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "content", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Content kept as is
    Approved,
    /// Content replaced by the reviewer's rewrite
    Rewritten(String),
}

/// Final reviewer output: reasoning plus either approval or a full rewrite
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFinalReview")]
pub struct FinalReview {
    pub reasoning: String,
    pub outcome: ReviewOutcome,
}

/// Wire shape of the final review: `answer` is either "approved" or the rewrite
#[derive(Deserialize)]
struct RawFinalReview {
    #[serde(alias = "thought_process")]
    reasoning: String,
    answer: String,
}

impl From<RawFinalReview> for FinalReview {
    fn from(raw: RawFinalReview) -> Self {
        let outcome = if raw.answer.trim().eq_ignore_ascii_case(APPROVED_LITERAL) {
            ReviewOutcome::Approved
        } else {
            ReviewOutcome::Rewritten(raw.answer)
        };
        Self {
            reasoning: raw.reasoning,
            outcome,
        }
    }
}

impl ReviewOutcome {
    /// Apply the outcome to a section, replacing content on rewrite
    pub fn apply(&self, section: &mut Section) {
        if let Self::Rewritten(text) = self {
            section.content = text.clone();
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

// =============================================================================
// Completed Section
// =============================================================================

/// Finalized section plus the research trail that produced it
#[derive(Debug, Clone, Serialize)]
pub struct CompletedSection {
    pub section: Section,
    /// Research iterations performed (0 when research was skipped)
    pub iterations: u32,
    /// Every search query issued for this section, in order
    pub queries: Vec<String>,
    /// Final review outcome
    pub review: ReviewOutcome,
}
