//! Structured Output Decoding
//!
//! Providers hand back the raw reply text. Two checks turn it into the
//! caller's type, both after the provider chain has returned:
//!
//! 1. The reply must contain JSON at all (`extract_json`).
//! 2. The JSON must decode into the contract type (`decode_contract`).
//!
//! Either failure is a `SchemaViolation` naming the contract. It is fatal to
//! the calling component and never retried or sent to a fallback provider.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::provider::{ChatRequest, LlmProvider, TokenUsage};
use crate::types::{ReportError, Result};

/// A named structured-output contract and its JSON Schema
#[derive(Debug, Clone)]
pub struct OutputContract {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputContract {
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }
}

/// Pull a JSON value out of a model reply.
///
/// Accepts bare JSON, fenced code blocks, and JSON surrounded by prose.
pub fn extract_json(text: &str, contract: &OutputContract) -> Result<Value> {
    let trimmed = strip_code_fence(text.trim());

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let candidate = match (trimmed.find(['{', '[']), trimmed.rfind(['}', ']'])) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    };

    serde_json::from_str::<Value>(candidate).map_err(|e| {
        ReportError::schema_violation(contract.name, format!("reply is not valid JSON: {}", e))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a JSON value into a contract type, or fail with `SchemaViolation`
pub fn decode_contract<T: DeserializeOwned>(contract: &OutputContract, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ReportError::schema_violation(contract.name, e.to_string()))
}

/// Run a structured call and decode the result into `T`
pub async fn generate_typed<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    contract: &OutputContract,
) -> Result<(T, TokenUsage)> {
    let response = provider.generate(request, &contract.schema).await?;
    let usage = response.usage;
    let value = extract_json(&response.content, contract)?;
    let typed = decode_contract(contract, value)?;
    Ok((typed, usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Queries {
        queries: Vec<String>,
    }

    fn contract() -> OutputContract {
        OutputContract::new("queries", json!({"type": "object"}))
    }

    #[test]
    fn test_extract_bare_json() {
        let value = extract_json(r#"{"queries": ["a"]}"#, &contract()).unwrap();
        assert_eq!(value["queries"][0], "a");
    }

    #[test]
    fn test_extract_fenced_json() {
        let value = extract_json("```json\n{\"queries\": []}\n```", &contract()).unwrap();
        assert!(value["queries"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_extract_json_in_prose() {
        let value =
            extract_json("Here you go: {\"queries\": [\"x\"]} hope it helps", &contract()).unwrap();
        assert_eq!(value["queries"][0], "x");
    }

    #[test]
    fn test_extract_rejects_non_json() {
        let err = extract_json("no json here", &contract()).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(matches!(
            &err,
            ReportError::SchemaViolation { contract, .. } if contract == "queries"
        ));
    }

    #[test]
    fn test_decode_contract_violation() {
        let err = decode_contract::<Queries>(&contract(), json!({"query": "wrong"})).unwrap_err();
        assert!(err.is_schema_violation());
        assert!(err.to_string().contains("queries"));
    }

    #[test]
    fn test_decode_contract_success() {
        let decoded: Queries = decode_contract(&contract(), json!({"queries": ["a", "b"]})).unwrap();
        assert_eq!(decoded.queries, vec!["a", "b"]);
    }
}
