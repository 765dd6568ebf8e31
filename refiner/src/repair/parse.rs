//! Stage 1: direct parse and strict validation
//!
//! Accepts only responses that already follow the response schema: a known
//! `status` with its matching payload key. Missing optional fields still get
//! their defaults through the shared normalizers.

use serde_json::Value;
use tracing::debug;

use super::coerce::{normalize_complete, normalize_questions, synthesized_question};
use crate::domain::OrchestrationResult;
use crate::error::ErrorKind;

/// Message used when the model reports an error without one
const MODEL_ERROR: &str = "The AI reported an error while refining the prompt.";

/// Parse `raw` as JSON and validate it. `None` means "try the next stage".
pub fn parse_direct(raw: &str) -> Option<OrchestrationResult> {
    let value: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "parse_direct: not valid JSON");
            return None;
        }
    };
    validate(&value)
}

/// Validate an already-parsed response object
pub fn validate(value: &Value) -> Option<OrchestrationResult> {
    let obj = value.as_object()?;
    let status = obj.get("status")?.as_str()?.trim().to_ascii_lowercase();
    debug!(%status, "validate: called");

    match status.as_str() {
        "refining" | "refining_further" => {
            let items = obj.get("questions")?.as_array()?;
            let questions = normalize_questions(items.iter());
            if questions.is_empty() {
                debug!("validate: refining without usable questions");
                return None;
            }
            Some(OrchestrationResult::Refining { questions })
        }
        "needs_more_context" => {
            let questions = obj
                .get("questions")
                .and_then(Value::as_array)
                .map(|items| normalize_questions(items.iter()))
                .unwrap_or_default();
            let questions = if questions.is_empty() {
                vec![synthesized_question()]
            } else {
                questions
            };
            Some(OrchestrationResult::Refining { questions })
        }
        "complete" => {
            let prompts = obj.get("finalPrompts")?.as_array()?;
            normalize_complete(obj, prompts.iter())
        }
        "error" => {
            let message = obj
                .get("message")
                .or_else(|| obj.get("error"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(MODEL_ERROR)
                .to_string();
            Some(OrchestrationResult::Error {
                message,
                kind: ErrorKind::Unknown,
            })
        }
        other => {
            debug!(status = %other, "validate: unknown status");
            None
        }
    }
}
