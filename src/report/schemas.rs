//! Structured Output Contracts
//!
//! JSON Schemas for every structured call in the pipeline. The Rust types
//! in `types::report` are the source of truth; these schemas describe the
//! same shapes to the model.

use serde_json::json;

use crate::ai::OutputContract;

pub fn section_plan() -> OutputContract {
    OutputContract::new(
        "section_plan",
        json!({
            "type": "object",
            "description": "Ordered report sections",
            "required": ["sections"],
            "additionalProperties": false,
            "properties": {
                "sections": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "description", "research", "content"],
                        "additionalProperties": false,
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Name for this section of the report"
                            },
                            "description": {
                                "type": "string",
                                "description": "Brief overview of the main topics and concepts covered"
                            },
                            "research": {
                                "type": "boolean",
                                "description": "Whether to perform web research for this section"
                            },
                            "content": {
                                "type": "string",
                                "description": "Leave empty"
                            }
                        }
                    }
                }
            }
        }),
    )
}

pub fn search_queries() -> OutputContract {
    OutputContract::new(
        "search_queries",
        json!({
            "type": "object",
            "required": ["queries"],
            "additionalProperties": false,
            "properties": {
                "queries": {
                    "type": "array",
                    "description": "Web search queries, most useful first",
                    "items": {"type": "string"}
                }
            }
        }),
    )
}

pub fn research_feedback() -> OutputContract {
    OutputContract::new(
        "research_feedback",
        json!({
            "type": "object",
            "required": ["reasoning", "verdict"],
            "additionalProperties": false,
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "What is good, what is missing"
                },
                "verdict": {
                    "type": "string",
                    "enum": ["continue_research", "finalize"]
                }
            }
        }),
    )
}

pub fn final_review() -> OutputContract {
    OutputContract::new(
        "final_review",
        json!({
            "type": "object",
            "required": ["reasoning", "answer"],
            "additionalProperties": false,
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "Analysis of the section write-up"
                },
                "answer": {
                    "type": "string",
                    "description": "\"approved\", or the complete rewritten section in markdown"
                }
            }
        }),
    )
}
