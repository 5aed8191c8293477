//! Generate Command
//!
//! Plans, researches and renders a report for a topic + outline.
//!
//! Usage:
//!   reportforge generate --topic <TEXT> (--outline <TEXT> | --outline-file <PATH>)
//!                        [--output <DIR>] [--provider <P>] [--model <M>]
//!                        [--format markdown|html]... [--dry-run]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::{LlmClient, create_from_config, create_shared_metrics};
use crate::cli::Output;
use crate::config::{Config, ConfigLoader, OutputFormat};
use crate::render::{render_all, report_stem};
use crate::report::{Report, ReportPipeline, SectionPlanner};
use crate::search::{SearchClient, create_search_provider};
use crate::types::{ReportError, Result, Section};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub topic: String,
    pub outline: Option<String>,
    pub outline_file: Option<PathBuf>,
    /// Output directory override
    pub output: Option<PathBuf>,
    /// LLM provider override
    pub provider: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Format override; empty keeps the configured formats
    pub formats: Vec<OutputFormat>,
    /// Plan only, print the sections
    pub dry_run: bool,
}

/// How a generate run ended, for the process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    Planned,
    Complete,
    /// Document written with placeholder sections
    Incomplete,
}

pub fn run(options: GenerateOptions) -> Result<GenerateOutcome> {
    let outline = read_outline(options.outline.as_deref(), options.outline_file.as_deref())?;
    let topic = options.topic.trim().to_string();
    if topic.is_empty() {
        return Err(ReportError::Config("Topic must not be empty".to_string()));
    }

    let mut config = ConfigLoader::load()?;
    apply_overrides(&mut config, &options);
    config.validate()?;

    let out = Output::new();
    let metrics = create_shared_metrics(uuid::Uuid::new_v4().to_string());
    let provider = create_from_config(&config.llm)?;
    let llm = LlmClient::new(
        provider,
        metrics.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    );
    info!("Using LLM provider: {} ({})", llm.provider_name(), llm.model());

    let rt = Runtime::new()?;

    if options.dry_run {
        let sections = rt.block_on(SectionPlanner::new(&llm).plan(&topic, &outline))?;
        print_plan(&out, &topic, &sections);
        return Ok(GenerateOutcome::Planned);
    }

    let search = SearchClient::new(create_search_provider(&config.search)?, &config.search)
        .with_metrics(metrics.clone());
    let pipeline = ReportPipeline::new(llm, search, config.research.clone());

    out.info(&format!("Generating report: {}", topic));
    let report = rt.block_on(pipeline.generate(&topic, &outline))?;

    let stem = config.output.dir.join(report_stem(&topic, Local::now()));
    let written = render_all(&report.document, &stem, &config.output.formats)?;

    print_report(&out, &report, &written);
    out.section("Metrics");
    println!("{}", metrics.summary().display());

    if report.is_complete() {
        Ok(GenerateOutcome::Complete)
    } else {
        out.warning(&format!(
            "Report is incomplete: {} of {} sections omitted",
            report.failed.len(),
            report.failed.len() + report.sections.len()
        ));
        Ok(GenerateOutcome::Incomplete)
    }
}

fn read_outline(inline: Option<&str>, file: Option<&Path>) -> Result<String> {
    let outline = match (inline, file) {
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        _ => {
            return Err(ReportError::Config(
                "Provide exactly one of --outline or --outline-file".to_string(),
            ));
        }
    };
    if outline.trim().is_empty() {
        return Err(ReportError::Config("Outline must not be empty".to_string()));
    }
    Ok(outline)
}

fn apply_overrides(config: &mut Config, options: &GenerateOptions) {
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    if let Some(dir) = &options.output {
        config.output.dir = dir.clone();
    }
    if !options.formats.is_empty() {
        config.output.formats = options.formats.clone();
    }
}

fn print_plan(out: &Output, topic: &str, sections: &[Section]) {
    out.header(&format!("Plan: {}", topic));
    for (i, section) in sections.iter().enumerate() {
        let research = if section.requires_research {
            "research"
        } else {
            "no research"
        };
        println!("  {}. {} ({})", i + 1, section.name, research);
        if !section.description.is_empty() {
            println!("     {}", section.description);
        }
    }
}

fn print_report(out: &Output, report: &Report, written: &[PathBuf]) {
    out.section("Report");
    out.field("Sections", report.sections.len());
    out.field("Omitted", report.failed.len());
    out.field("Queries", report.total_queries());
    for section in &report.sections {
        println!(
            "  - {} ({} iterations, {})",
            section.section.name,
            section.iterations,
            if section.review.is_approved() {
                "approved"
            } else {
                "rewritten"
            }
        );
    }
    for failed in &report.failed {
        out.error(&format!("{}: {}", failed.name, failed.error));
    }
    for path in written {
        out.success(&format!("Wrote {}", path.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_outline_sources() {
        assert_eq!(read_outline(Some("# A"), None).unwrap(), "# A");

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("outline.md");
        std::fs::write(&file, "# Features\n# Limitations").unwrap();
        assert_eq!(
            read_outline(None, Some(&file)).unwrap(),
            "# Features\n# Limitations"
        );

        assert!(read_outline(None, None).is_err());
        assert!(read_outline(Some("a"), Some(&file)).is_err());
        assert!(read_outline(Some("  "), None).is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &GenerateOptions {
                provider: Some("ollama".to_string()),
                model: Some("llama3.1".to_string()),
                output: Some(PathBuf::from("out")),
                formats: vec![OutputFormat::Html],
                ..Default::default()
            },
        );
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.output.formats, vec![OutputFormat::Html]);
    }

    #[test]
    fn test_empty_formats_keep_config() {
        let mut config = Config::default();
        apply_overrides(&mut config, &GenerateOptions::default());
        assert_eq!(config.output.formats.len(), 2);
    }
}
