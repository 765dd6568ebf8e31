//! Stage 2: structural repair and field coercion
//!
//! Handles two kinds of drift: text that is not JSON as a whole (code fences,
//! prose around the object) and JSON whose shape deviates from the response
//! schema (missing or unknown `status`, singular fields, snake_case keys).
//! The normalizers here also back-fill defaults for stage 1.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::parse::validate;
use crate::domain::{
    DEFAULT_CONFIDENCE, MAX_ANSWERS, MAX_QUESTIONS, MIN_ANSWERS, OrchestrationResult, QuestionKind,
    RefinementQuestion, SuggestedApproach,
};

/// Choices used to pad questions that arrive with fewer than two answers
const GENERIC_ANSWERS: [&str; 3] = ["Not sure", "Let the AI decide", "Other"];

/// Try to recover a result from text that failed stage 1
pub fn repair_structure(raw: &str) -> Option<OrchestrationResult> {
    debug!(raw_len = raw.len(), "repair_structure: called");

    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        debug!("repair_structure: valid JSON, coercing shape");
        return coerce_value(&value);
    }

    let stripped = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        debug!("repair_structure: parsed after stripping fences");
        return validate(&value).or_else(|| coerce_value(&value));
    }

    // Prose may carry its own backticks, so the untouched text gets a turn too
    let value = extract_object(stripped).or_else(|| extract_object(raw))?;
    debug!("repair_structure: extracted embedded object");
    validate(&value).or_else(|| coerce_value(&value))
}

/// Remove an opening ```` ```lang ```` line and a closing ```` ``` ````.
///
/// Only the outermost fence is touched: fences inside the payload (a prompt
/// that itself contains a code block) stay as they are.
pub fn strip_code_fences(content: &str) -> &str {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let is_info = |s: &str| s.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        text = match rest.split_once('\n') {
            Some((info, body)) if is_info(info) => body,
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Find the first balanced `{...}` that parses as a JSON object.
///
/// Braces inside JSON strings (and escaped quotes inside those strings) do
/// not count toward the balance.
pub fn extract_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            let candidate = &text[start..=end];
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) if value.is_object() => return Some(value),
                Ok(_) | Err(_) => debug!(start, end, "extract_object: candidate did not parse"),
            }
        }
        search_from = start + 1;
    }
    None
}

/// Index of the brace closing the one at `start`
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Coerce a parsed value whose shape drifted from the schema
pub fn coerce_value(value: &Value) -> Option<OrchestrationResult> {
    let obj = match value {
        Value::Object(obj) => obj,
        // A lone object wrapped in an array
        Value::Array(items) => items.first()?.as_object()?,
        _ => return None,
    };

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty());
    debug!(?status, "coerce_value: called");

    match status.as_deref() {
        Some("refining" | "refining_further" | "needs_more_context") => coerce_refining(obj),
        Some("complete") => coerce_complete(obj),
        Some("error") => validate(value),
        _ => infer(obj),
    }
}

/// Infer the status from which payload keys are present
fn infer(obj: &Map<String, Value>) -> Option<OrchestrationResult> {
    if obj.contains_key("questions") || obj.contains_key("question") {
        debug!("infer: treating as refining");
        return coerce_refining(obj);
    }
    if PROMPT_KEYS.iter().any(|k| obj.contains_key(*k)) {
        debug!("infer: treating as complete");
        return coerce_complete(obj);
    }
    debug!("infer: no recognizable payload");
    None
}

fn coerce_refining(obj: &Map<String, Value>) -> Option<OrchestrationResult> {
    let questions = match obj.get("questions").or_else(|| obj.get("question"))? {
        Value::Array(items) => normalize_questions(items.iter()),
        single => normalize_questions(std::iter::once(single)),
    };
    if questions.is_empty() {
        return None;
    }
    Some(OrchestrationResult::Refining { questions })
}

const PROMPT_KEYS: [&str; 6] = ["finalPrompts", "final_prompts", "prompts", "prompt", "result", "finalPrompt"];

fn coerce_complete(obj: &Map<String, Value>) -> Option<OrchestrationResult> {
    let payload = PROMPT_KEYS.iter().find_map(|k| obj.get(*k))?;
    match payload {
        Value::Array(items) => normalize_complete(obj, items.iter()),
        single => normalize_complete(obj, std::iter::once(single)),
    }
}

/// Normalize question items into a validated batch.
///
/// Items without question text are dropped. Ids are defaulted and made
/// unique; `depends_on` keeps only ids of other questions in the batch.
pub fn normalize_questions<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<RefinementQuestion> {
    let mut seen = HashSet::new();
    let mut questions: Vec<RefinementQuestion> = items
        .filter_map(normalize_question)
        .take(MAX_QUESTIONS)
        .enumerate()
        .map(|(index, mut q)| {
            if q.id.is_empty() || !seen.insert(q.id.clone()) {
                q.id = format!("question-{}", index + 1);
                seen.insert(q.id.clone());
            }
            q
        })
        .collect();

    let ids: HashSet<String> = questions.iter().map(|q| q.id.clone()).collect();
    for q in &mut questions {
        let own = q.id.clone();
        q.depends_on.retain(|dep| dep != &own && ids.contains(dep));
    }
    questions
}

/// One question; the id is left empty when absent
fn normalize_question(value: &Value) -> Option<RefinementQuestion> {
    let (obj, text) = match value {
        Value::String(text) => (None, text.as_str()),
        Value::Object(obj) => {
            let text = first_str(obj, &["question", "text", "title"])?;
            (Some(obj), text)
        }
        _ => return None,
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(obj) = obj else {
        return Some(RefinementQuestion::new(
            "",
            QuestionKind::default(),
            text,
            pad_answers(Vec::new()),
        ));
    };

    let answers = ["answers", "options", "choices", "suggestions"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|items| string_items(items.iter()))
        .unwrap_or_default();

    let mut q = RefinementQuestion::new(
        first_str(obj, &["id"]).map(str::trim).unwrap_or_default(),
        first_str(obj, &["type", "kind"])
            .and_then(QuestionKind::parse)
            .unwrap_or_default(),
        text,
        pad_answers(answers),
    );
    q.allow_custom = first_bool(obj, &["allowCustom", "allow_custom"]).unwrap_or(true);
    q.required = first_bool(obj, &["required"]).unwrap_or(false);
    q.depends_on = ["dependsOn", "depends_on"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|items| string_items(items.iter()))
        .unwrap_or_default();
    Some(q)
}

/// Trim, de-duplicate and cap answers, then pad up to the minimum
fn pad_answers(answers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for answer in answers {
        if !out.contains(&answer) {
            out.push(answer);
        }
    }
    out.truncate(MAX_ANSWERS);
    for generic in GENERIC_ANSWERS {
        if out.len() >= MIN_ANSWERS {
            break;
        }
        if !out.iter().any(|a| a == generic) {
            out.push(generic.to_string());
        }
    }
    out
}

/// Build a complete result from prompt items plus optional metadata
pub fn normalize_complete<'a>(
    obj: &Map<String, Value>,
    items: impl Iterator<Item = &'a Value>,
) -> Option<OrchestrationResult> {
    let prompts = string_items(items);
    if prompts.is_empty() {
        debug!("normalize_complete: no usable prompts");
        return None;
    }

    let confidence = obj
        .get("confidence")
        .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .filter(|c: &f64| c.is_finite())
        .map(|c| c.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let approach = first_str(obj, &["suggestedApproach", "suggested_approach", "approach"])
        .and_then(SuggestedApproach::parse)
        .unwrap_or_default();

    let next_steps = ["nextSteps", "next_steps"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|items| string_items(items.iter()))
        .unwrap_or_default();

    Some(OrchestrationResult::Complete {
        prompts,
        confidence,
        approach,
        next_steps,
    })
}

/// The clarification question used when the model asks for context without
/// saying what it needs
pub fn synthesized_question() -> RefinementQuestion {
    RefinementQuestion::new(
        "question-1",
        QuestionKind::Clarification,
        "Could you share more context about what you want to achieve?",
        vec![
            "Describe the goal in more detail".to_string(),
            "Describe who will use the result".to_string(),
            "Describe the expected output".to_string(),
        ],
    )
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn first_bool(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_bool))
}

/// Non-empty trimmed strings; numbers and booleans are stringified
fn string_items<'a>(items: impl Iterator<Item = &'a Value>) -> Vec<String> {
    items
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}
