//! Prompt building utilities for LLM providers.
//!
//! Providers without native schema enforcement get the contract spelled out
//! in the system message.

use serde_json::Value;

/// Append JSON schema instructions to a system message.
///
/// Returns the original message if schema is null.
pub fn build_schema_system(system: &str, schema: &Value) -> String {
    if schema.is_null() {
        return system.to_string();
    }

    let schema_str = serde_json::to_string_pretty(schema).unwrap_or_default();
    format!(
        "{}\n\n---\n\nRespond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        system, schema_str
    )
}
