//! Document Rendering
//!
//! Writes the assembled markdown document to disk in each configured
//! format. Markdown is written verbatim. HTML is a print-ready page whose
//! CSS paginates on `##` headings and styles `Sources` blocks as references.

mod html;

pub use html::HtmlRenderer;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::OutputFormat;
use crate::types::{ReportError, Result};

pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// Render `document` to `stem` plus the format's extension
    fn render(&self, document: &str, stem: &Path) -> Result<PathBuf>;
}

pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, document: &str, stem: &Path) -> Result<PathBuf> {
        let path = output_path(stem, self.format())?;
        std::fs::write(&path, document)?;
        Ok(path)
    }
}

pub fn create_renderer(format: OutputFormat) -> Result<Box<dyn DocumentRenderer>> {
    Ok(match format {
        OutputFormat::Markdown => Box::new(MarkdownRenderer),
        OutputFormat::Html => Box::new(HtmlRenderer::new()?),
    })
}

/// Render into every requested format; returns the written paths
pub fn render_all(document: &str, stem: &Path, formats: &[OutputFormat]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = create_renderer(*format)?.render(document, stem)?;
        info!("Wrote {} report to {}", format, path.display());
        written.push(path);
    }
    Ok(written)
}

/// `<slug>-<timestamp>` file stem for a topic
pub fn report_stem(topic: &str, at: DateTime<Local>) -> String {
    let mut slug = String::new();
    for c in topic.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_end_matches('-').chars().take(60).collect();
    let slug = if slug.is_empty() { "report".to_string() } else { slug };
    format!("{}-{}", slug.trim_end_matches('-'), at.format("%Y%m%d-%H%M%S"))
}

fn output_path(stem: &Path, format: OutputFormat) -> Result<PathBuf> {
    if stem.file_name().is_none() {
        return Err(ReportError::Render(format!(
            "Invalid output path: {}",
            stem.display()
        )));
    }
    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(stem.with_extension(format.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("nested").join("report");
        let path = MarkdownRenderer.render("# Title\n\nBody", &stem).unwrap();

        assert_eq!(path, dir.path().join("nested").join("report.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Title\n\nBody");
    }

    #[test]
    fn test_render_all_formats() {
        let dir = TempDir::new().unwrap();
        let stem = dir.path().join("report");
        let written = render_all(
            "# T\n\n## A\n\ntext",
            &stem,
            &[OutputFormat::Markdown, OutputFormat::Html],
        )
        .unwrap();

        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.exists()));
        assert_eq!(written[1].extension().unwrap(), "html");
    }

    #[test]
    fn test_report_stem() {
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            report_stem("Rust vs. Go: Concurrency!", at),
            "rust-vs-go-concurrency-20260304-050607"
        );
        assert_eq!(report_stem("???", at), "report-20260304-050607");
    }
}
