//! Report Prompts
//!
//! One builder per pipeline call. Each returns the system/user pair; the
//! system message carries all context, the user message is a short command.

use crate::ai::ChatRequest;
use crate::types::Section;

// =============================================================================
// Planning
// =============================================================================

/// Parse a free-form outline into section specs
pub fn section_planning(topic: &str, outline: &str) -> ChatRequest {
    let system = format!(
        r#"You are a report outline parser.

Your goal is to take a topic and a report outline and split the outline into
the individual sections of the report. Analysts will research each section
separately.

The overall topic of the report is:

{topic}

The report outline is as follows:

{outline}

<end report outline>

Produce the sections of the report, in outline order. Each section has:

- name: name for this section of the report, taken from the outline
- description: brief overview of the main topics and concepts the section covers
- research: whether web research is needed for this section (true/false)
- content: leave empty

Decide carefully which sections need research. Summaries and conclusions
distill other sections and need none. Body sections almost always do.

Capture every top-level heading of the outline as a section and copy the text
under it into the description verbatim."#
    );

    ChatRequest::new(system, "Populate the sections of the report.")
}

// =============================================================================
// Section Research Loop
// =============================================================================

/// Generate the next batch of search queries for a section
pub fn query_generation(
    topic: &str,
    section: &Section,
    feedback: &str,
    max_queries: usize,
) -> ChatRequest {
    let system = format!(
        r#"You are a researcher gathering information for one section of a report.

Generate up to {max_queries} web search queries that will find the information
this section still needs.

The overall topic of the report is:

{topic}

The section to research:

{name}
{description}

What has been written so far (blank on the first attempt):

{content}

Feedback from the reviewer of the current draft (blank on the first attempt):

{feedback}"#,
        name = section.name,
        description = section.description,
        content = section.content,
    );

    ChatRequest::new(system, "Please generate the search queries.")
}

/// Draft new section material from research results
pub fn section_writing(topic: &str, section: &Section, research_material: &str) -> ChatRequest {
    let system = format!(
        r#"You are a researcher writing one section of a report.

The overall topic of the report is:

{topic}

The section to write:

{name}
{description}

What has been written so far (blank on the first attempt):

{content}

Write the section using only the following research material:

{research_material}

<end research material>

Style:
- Detailed and comprehensive, without repetition or filler
- No marketing language
- Technical focus
- Open with the single most important insight in **bold**

Structure:
- Valid markdown
- Use ## for the section title
- Use a table (2-3 items compared) or a short list (3-5 items) only when it
  makes the point clearer
- Cite sources inline as [1], [2], ...
- End with a ### Sources heading listing each cited source as `- Title : URL`"#,
        name = section.name,
        description = section.description,
        content = section.content,
    );

    ChatRequest::new(system, "Please generate the content for the section.")
}

/// Judge whether the section needs more research
pub fn research_feedback(topic: &str, section: &Section) -> ChatRequest {
    let system = format!(
        r#"You are a reviewer deciding whether a report section has been researched enough.

If the section is thorough and comprehensive, finalize it. If information is
missing or the content has problems, ask for more research and explain what is
missing in your reasoning; the researcher will read it.

The overall topic of the report is:

{topic}

The section under review:

{name}
{description}

The current content:

{content}

Answer with your reasoning and a verdict: "finalize" when the section is
complete, "continue_research" when more research is needed."#,
        name = section.name,
        description = section.description,
        content = section.content,
    );

    ChatRequest::new(system, "Please review the write-up.")
}

/// Approve the section or return a complete rewrite
pub fn final_review(topic: &str, section: &Section) -> ChatRequest {
    let system = format!(
        r#"Your job is to finalize a report section.

Decide whether the write-up is fine as is or needs revision. Content that does
not flow well should be rewritten. Check that it is valid markdown with a
logical structure and good readability.

The overall topic of the report is:

{topic}

The section:

{name}
{description}

The current write-up:

{content}

Answer with your reasoning, then either the single word "approved" if the
write-up is good as is, or the complete rewritten section. A rewrite must keep
all of the information, citations and the ### Sources list."#,
        name = section.name,
        description = section.description,
        content = section.content,
    );

    ChatRequest::new(system, "Please review the write-up.")
}

// =============================================================================
// Introduction / Conclusion
// =============================================================================

/// Which framing section to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Introduction,
    Conclusion,
}

impl Framing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framing::Introduction => "introduction",
            Framing::Conclusion => "conclusion",
        }
    }
}

pub fn framing_section(topic: &str, report_body: &str, framing: Framing) -> ChatRequest {
    let system = format!(
        r#"You are a technical writer finishing a report on {topic}.

You will write either the introduction or the conclusion; the user tells you
which. No preamble.

Target 300-400 words, previewing (introduction) or recapping (conclusion)
every section of the report. Use markdown.

For the introduction, start with a compelling title as a # heading, followed
by ## Introduction.

For the conclusion, use ## Conclusion as the heading.

The sections of the report:

{report_body}"#
    );

    ChatRequest::new(system, format!("Please write the {}.", framing.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> Section {
        let mut section = Section::new("Features", "Compare the feature sets", true);
        section.append("Existing draft");
        section
    }

    #[test]
    fn test_query_prompt_carries_context() {
        let request = query_generation("X vs Y", &section(), "needs benchmarks", 4);
        assert!(request.system.contains("X vs Y"));
        assert!(request.system.contains("Compare the feature sets"));
        assert!(request.system.contains("Existing draft"));
        assert!(request.system.contains("needs benchmarks"));
        assert!(request.system.contains("up to 4"));
        assert_eq!(request.user, "Please generate the search queries.");
    }

    #[test]
    fn test_writing_prompt_includes_material() {
        let request = section_writing("X vs Y", &section(), "Sources:\n\nSource A");
        assert!(request.system.contains("Sources:\n\nSource A"));
        assert!(request.system.contains("### Sources"));
    }

    #[test]
    fn test_framing_user_message() {
        assert_eq!(
            framing_section("t", "body", Framing::Introduction).user,
            "Please write the introduction."
        );
        let conclusion = framing_section("t", "the body", Framing::Conclusion);
        assert_eq!(conclusion.user, "Please write the conclusion.");
        assert!(conclusion.system.contains("the body"));
    }
}
