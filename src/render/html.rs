//! Print-ready HTML output

use std::path::{Path, PathBuf};

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

use super::{DocumentRenderer, output_path};
use crate::config::OutputFormat;
use crate::constants::markup::SOURCES_HEADING;
use crate::types::{ReportError, Result};

const STYLE: &str = r#"
@page { size: A4; margin: 2.5cm 2cm; }
body { font-family: Georgia, "Times New Roman", serif; font-size: 11pt; line-height: 1.5; color: #222; max-width: 46em; margin: 0 auto; }
h1 { font-size: 22pt; margin-bottom: 0.4em; }
h2 { font-size: 16pt; border-bottom: 1px solid #ccc; padding-bottom: 0.2em; break-before: page; page-break-before: always; }
h1 + h2 { break-before: auto; page-break-before: auto; }
h3 { font-size: 13pt; }
table { border-collapse: collapse; width: 100%; margin: 1em 0; }
th, td { border: 1px solid #bbb; padding: 0.3em 0.6em; text-align: left; }
th { background: #f2f2f2; }
code { font-family: Menlo, Consolas, monospace; font-size: 0.9em; }
section.sources { font-size: 9pt; color: #555; margin-top: 1.5em; }
section.sources h3 { font-size: 10pt; text-transform: uppercase; letter-spacing: 0.05em; }
"#;

pub struct HtmlRenderer {
    sources_heading: Regex,
    any_heading: Regex,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self> {
        let sources = format!(
            r"<h[1-6][^>]*>\s*{}\s*</h[1-6]>",
            regex::escape(SOURCES_HEADING)
        );
        Ok(Self {
            sources_heading: Regex::new(&sources)
                .map_err(|e| ReportError::Render(format!("Invalid sources pattern: {}", e)))?,
            any_heading: Regex::new(r"<h[1-6][^>]*>")
                .map_err(|e| ReportError::Render(format!("Invalid heading pattern: {}", e)))?,
        })
    }

    /// Convert markdown to a complete HTML page
    pub fn to_html(&self, document: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut body = String::with_capacity(document.len() * 2);
        html::push_html(&mut body, Parser::new_ext(document, options));
        let body = self.wrap_sources(&body);

        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
            escape(&document_title(document)),
            STYLE,
            body
        )
    }

    /// Wrap each Sources heading and everything up to the next heading
    fn wrap_sources(&self, html: &str) -> String {
        let heading_starts: Vec<usize> = self.any_heading.find_iter(html).map(|m| m.start()).collect();

        let mut out = String::with_capacity(html.len() + 128);
        let mut cursor = 0;
        for heading in self.sources_heading.find_iter(html) {
            let end = heading_starts
                .iter()
                .copied()
                .find(|&start| start >= heading.end())
                .unwrap_or(html.len());
            out.push_str(&html[cursor..heading.start()]);
            out.push_str("<section class=\"sources\">\n");
            out.push_str(&html[heading.start()..end]);
            out.push_str("</section>\n");
            cursor = end;
        }
        out.push_str(&html[cursor..]);
        out
    }
}

impl DocumentRenderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, document: &str, stem: &Path) -> Result<PathBuf> {
        let path = output_path(stem, self.format())?;
        std::fs::write(&path, self.to_html(document))?;
        Ok(path)
    }
}

/// First `#` heading, or a generic title
fn document_title(document: &str) -> String {
    document
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Report".to_string())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Rust & Go\n\n## Introduction\n\nIntro.\n\n## Features\n\n**Key point** [1]\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\n### Sources\n\n- Rust : https://rust-lang.org\n\n## Conclusion\n\nDone ~~maybe~~.";

    #[test]
    fn test_sources_block_wrapped() {
        let html = HtmlRenderer::new().unwrap().to_html(DOC);

        let open = html.find("<section class=\"sources\">").unwrap();
        let close = html.find("</section>").unwrap();
        let sources = &html[open..close];
        assert!(sources.contains("<h3>Sources</h3>"));
        assert!(sources.contains("https://rust-lang.org"));
        assert!(!sources.contains("Conclusion"));
        assert!(html[close..].contains("<h2>Conclusion</h2>"));
    }

    #[test]
    fn test_extensions_and_page_setup() {
        let html = HtmlRenderer::new().unwrap().to_html(DOC);
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>maybe</del>"));
        assert!(html.contains("@page"));
        assert!(html.contains("<title>Rust &amp; Go</title>"));
    }

    #[test]
    fn test_document_without_sources_untouched() {
        let renderer = HtmlRenderer::new().unwrap();
        let html = renderer.to_html("## Only\n\ntext");
        assert!(!html.contains("<section"));
        assert!(html.contains("<title>Report</title>"));
    }
}
