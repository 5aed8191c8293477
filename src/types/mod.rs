pub mod error;
pub mod report;
pub mod utils;

pub use error::{ErrorCategory, ErrorClassifier, LlmError, ReportError, Result};
pub use report::{
    APPROVED_LITERAL, CompletedSection, Feedback, FinalReview, ResearchVerdict, ReviewOutcome,
    SearchQuerySet, Section, SectionPlan,
};
pub use utils::{one_line, truncate_chars};
