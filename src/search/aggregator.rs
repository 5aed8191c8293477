//! Search Result Aggregation
//!
//! Flattens search responses, drops duplicate URLs (first occurrence wins)
//! and formats the survivors into the research-material text handed to the
//! drafting prompt.

use std::collections::HashSet;

use tracing::warn;

use super::{SearchResponse, SearchResult};
use crate::constants::{markup::TRUNCATION_MARKER, research::CHARS_PER_TOKEN};
use crate::types::truncate_chars;

#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    max_tokens_per_source: usize,
    include_raw_content: bool,
}

impl ResultAggregator {
    pub fn new(max_tokens_per_source: usize, include_raw_content: bool) -> Self {
        Self {
            max_tokens_per_source,
            include_raw_content,
        }
    }

    /// Character cap for raw content
    pub fn char_limit(&self) -> usize {
        self.max_tokens_per_source * CHARS_PER_TOKEN
    }

    /// Unique results across all responses, in first-seen order
    pub fn deduplicate<'a>(
        &self,
        responses: impl IntoIterator<Item = &'a SearchResponse>,
    ) -> Vec<&'a SearchResult> {
        let mut seen = HashSet::new();
        responses
            .into_iter()
            .flat_map(|response| response.results.iter())
            .filter(|result| seen.insert(result.url.as_str()))
            .collect()
    }

    /// Format responses into a single research-material blob.
    ///
    /// Returns an empty string when there are no results.
    pub fn aggregate<'a>(&self, responses: impl IntoIterator<Item = &'a SearchResponse>) -> String {
        let unique = self.deduplicate(responses);
        if unique.is_empty() {
            return String::new();
        }

        let mut formatted = String::from("Sources:\n\n");
        for source in unique {
            self.format_source(&mut formatted, source);
        }
        formatted.trim().to_string()
    }

    fn format_source(&self, out: &mut String, source: &SearchResult) {
        out.push_str(&format!("Source {}:\n===\n", source.title));
        out.push_str(&format!("URL: {}\n===\n", source.url));
        out.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            source.content
        ));

        if self.include_raw_content {
            let raw = source.raw_content.as_deref().unwrap_or_else(|| {
                warn!(url = %source.url, "No raw content for source");
                ""
            });
            let (kept, truncated) = truncate_chars(raw, self.char_limit());
            out.push_str(&format!(
                "Full source content limited to {} tokens: {}{}\n",
                self.max_tokens_per_source,
                kept,
                if truncated { TRUNCATION_MARKER } else { "" }
            ));
        }

        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::result;
    use proptest::prelude::*;

    fn response(results: Vec<SearchResult>) -> SearchResponse {
        SearchResponse {
            query: "q".to_string(),
            results,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let responses = vec![
            response(vec![result("First", "https://a.example", "first excerpt")]),
            response(vec![
                result("Second", "https://a.example", "second excerpt"),
                result("Other", "https://b.example", "other excerpt"),
            ]),
        ];
        let aggregator = ResultAggregator::new(1000, false);

        let text = aggregator.aggregate(&responses);
        assert!(text.contains("first excerpt"));
        assert!(!text.contains("second excerpt"));
        assert!(text.find("https://a.example").unwrap() < text.find("https://b.example").unwrap());
        assert_eq!(text, aggregator.aggregate(&responses));
    }

    #[test]
    fn test_block_format() {
        let responses = vec![response(vec![result("Title", "https://t.example", "excerpt")])];
        let text = ResultAggregator::new(1000, false).aggregate(&responses);
        assert_eq!(
            text,
            "Sources:\n\nSource Title:\n===\nURL: https://t.example\n===\nMost relevant content from source: excerpt\n==="
        );
    }

    #[test]
    fn test_raw_content_truncation() {
        let raw: String = ('a'..='z').cycle().take(100).collect();
        let mut source = result("Long", "https://long.example", "excerpt");
        source.raw_content = Some(raw.clone());

        let text = ResultAggregator::new(10, true).aggregate(&[response(vec![source])]);
        let expected = format!(
            "Full source content limited to 10 tokens: {}{}",
            &raw[..40],
            TRUNCATION_MARKER
        );
        assert!(text.ends_with(&expected));
        assert!(!text.contains(&raw[..41]));
    }

    #[test]
    fn test_short_raw_content_not_marked() {
        let mut source = result("Short", "https://short.example", "excerpt");
        source.raw_content = Some("tiny".to_string());
        let text = ResultAggregator::new(10, true).aggregate(&[response(vec![source])]);
        assert!(text.ends_with("limited to 10 tokens: tiny"));
    }

    #[test]
    fn test_missing_raw_content_is_empty() {
        let text = ResultAggregator::new(10, true).aggregate(&[response(vec![result(
            "None",
            "https://none.example",
            "excerpt",
        )])]);
        assert!(text.ends_with("limited to 10 tokens:"));
    }

    #[test]
    fn test_empty_input() {
        let aggregator = ResultAggregator::new(1000, true);
        assert_eq!(aggregator.aggregate(&Vec::<SearchResponse>::new()), "");
        assert_eq!(aggregator.aggregate(&[response(Vec::new())]), "");
    }

    fn arb_result() -> impl Strategy<Value = SearchResult> {
        (0..6u8, "[a-z ]{0,12}").prop_map(|(id, content)| SearchResult {
            title: format!("Title {}", id),
            url: format!("https://site{}.example", id),
            content,
            raw_content: None,
        })
    }

    proptest! {
        #[test]
        fn prop_dedup_keeps_first_and_is_unique(
            batches in prop::collection::vec(prop::collection::vec(arb_result(), 0..6), 0..4)
        ) {
            let responses: Vec<SearchResponse> = batches.into_iter().map(response).collect();
            let aggregator = ResultAggregator::new(100, false);
            let unique = aggregator.deduplicate(&responses);

            let mut urls: Vec<&str> = unique.iter().map(|r| r.url.as_str()).collect();
            let total = urls.len();
            urls.dedup();
            prop_assert_eq!(urls.len(), total);
            let distinct: HashSet<&str> = urls.iter().copied().collect();
            prop_assert_eq!(distinct.len(), total);

            for kept in &unique {
                let first = responses
                    .iter()
                    .flat_map(|r| r.results.iter())
                    .find(|r| r.url == kept.url)
                    .unwrap();
                prop_assert!(std::ptr::eq(first, *kept));
            }
        }

        #[test]
        fn prop_aggregate_is_deterministic(
            batches in prop::collection::vec(prop::collection::vec(arb_result(), 0..6), 0..4)
        ) {
            let responses: Vec<SearchResponse> = batches.into_iter().map(response).collect();
            let aggregator = ResultAggregator::new(100, true);
            prop_assert_eq!(aggregator.aggregate(&responses), aggregator.aggregate(&responses));
        }
    }
}
