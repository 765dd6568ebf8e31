//! Generation request types
//!
//! One request carries everything the transport needs for a single
//! structured-output call. The response is raw text; interpreting it is the
//! repair pipeline's job.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// A generation request - everything needed for one model call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Model identifier (e.g. "gemini-2.5-pro")
    pub model: String,

    /// Conversational text: the idea plus prior turns
    pub contents: String,

    /// System instruction rendered by the context builder
    pub system_instruction: String,

    /// JSON schema the model output should follow
    pub response_schema: serde_json::Value,

    /// Max output tokens (from config)
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        contents: impl Into<String>,
        system_instruction: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        let request = Self {
            model: model.into(),
            contents: contents.into(),
            system_instruction: system_instruction.into(),
            response_schema: refinement_schema(),
            max_output_tokens,
        };
        debug!(
            model = %request.model,
            contents_len = request.contents.len(),
            instruction_len = request.system_instruction.len(),
            "GenerationRequest::new: built"
        );
        request
    }
}

/// Output schema for refinement responses.
///
/// Written in the OpenAPI subset the Gemini API accepts (upper-case types).
pub fn refinement_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "status": {
                "type": "STRING",
                "description": "Either 'refining' if you need to ask more questions, or 'complete' if you have enough information.",
                "enum": ["refining", "complete", "needs_more_context"]
            },
            "questions": {
                "type": "ARRAY",
                "description": "Between 1 and 4 question objects. Only include this if status is 'refining'.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "type": {
                            "type": "STRING",
                            "enum": ["clarification", "specification", "scenario", "constraint", "example", "priority"]
                        },
                        "question": { "type": "STRING" },
                        "answers": {
                            "type": "ARRAY",
                            "description": "Between 2 and 4 concise suggested answers.",
                            "items": { "type": "STRING" }
                        },
                        "allowCustom": { "type": "BOOLEAN" },
                        "required": { "type": "BOOLEAN" },
                        "dependsOn": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["question", "answers"]
                }
            },
            "finalPrompts": {
                "type": "ARRAY",
                "description": "Final, detailed prompts. Only include this if status is 'complete'.",
                "items": { "type": "STRING" }
            },
            "confidence": { "type": "INTEGER", "description": "0-100" },
            "suggestedApproach": { "type": "STRING", "enum": ["detailed", "concise", "comprehensive"] },
            "nextSteps": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["status"]
    })
}
