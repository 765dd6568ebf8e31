//! Response repair pipeline
//!
//! Turns raw model text into an [`OrchestrationResult`] through three stages,
//! each a pure function returning `None` when it cannot help:
//!
//! 1. [`parse::parse_direct`]: strict parse and validation
//! 2. [`coerce::repair_structure`]: fence stripping, object extraction, shape coercion
//! 3. [`fallback::synthesize`]: heuristic result, always succeeds
//!
//! Only a blank response is an error.

use tracing::{debug, info, warn};

use crate::domain::OrchestrationResult;
use crate::error::RefineError;
use crate::events::EventEmitter;

pub mod coerce;
pub mod fallback;
pub mod parse;

/// Pipeline stage names used in logs and telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Coerce,
    Fallback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Coerce => "coerce",
            Self::Fallback => "fallback",
        }
    }
}

/// Run the full pipeline over `raw`. `idea` feeds the placeholder prompts of
/// the fallback stage.
pub fn repair(raw: &str, idea: &str, emitter: &EventEmitter) -> Result<OrchestrationResult, RefineError> {
    debug!(raw_len = raw.len(), "repair: called");

    if raw.trim().is_empty() {
        warn!("repair: empty response");
        emitter.repair_stage(Stage::Parse.as_str(), "empty", "");
        return Err(RefineError::EmptyResponse);
    }

    if let Some(result) = parse::parse_direct(raw) {
        info!(status = result.status(), "repair: accepted by direct parse");
        emitter.repair_stage(Stage::Parse.as_str(), "accepted", result.status());
        return Ok(result);
    }
    emitter.repair_stage(Stage::Parse.as_str(), "rejected", "");

    if let Some(result) = coerce::repair_structure(raw) {
        info!(status = result.status(), "repair: recovered by structural repair");
        emitter.repair_stage(Stage::Coerce.as_str(), "accepted", result.status());
        return Ok(result);
    }
    emitter.repair_stage(Stage::Coerce.as_str(), "rejected", "");

    let result = fallback::synthesize(raw, idea);
    warn!(status = result.status(), "repair: used heuristic fallback");
    emitter.repair_stage(Stage::Fallback.as_str(), "synthesized", result.status());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::events::Event;
    use crate::events::recording::RecordingTelemetry;

    fn stages(sink: &RecordingTelemetry) -> Vec<(String, String)> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::RepairStage { stage, outcome, .. } => Some((stage, outcome)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_blank_response_is_empty_error() {
        let err = repair("  \n ", "idea", &EventEmitter::disabled()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[test]
    fn test_direct_parse_stage() {
        let sink = Arc::new(RecordingTelemetry::default());
        let emitter = EventEmitter::new(sink.clone(), "s");
        let raw = r#"{"status":"complete","finalPrompts":["p1","p2"]}"#;

        let result = repair(raw, "idea", &emitter).unwrap();
        assert_eq!(result.prompts().map(|p| p.len()), Some(2));
        assert_eq!(stages(&sink), vec![("parse".to_string(), "accepted".to_string())]);
    }

    #[test]
    fn test_structural_repair_stage() {
        let sink = Arc::new(RecordingTelemetry::default());
        let emitter = EventEmitter::new(sink.clone(), "s");
        let raw = "```json\n{\"questions\":[{\"question\":\"Which OS?\",\"answers\":[\"Linux\",\"macOS\"]}]}\n```";

        let result = repair(raw, "idea", &emitter).unwrap();
        assert_eq!(result.status(), "refining");
        assert_eq!(
            stages(&sink),
            vec![
                ("parse".to_string(), "rejected".to_string()),
                ("coerce".to_string(), "accepted".to_string())
            ]
        );
    }

    #[test]
    fn test_fallback_stage_is_distinguishable() {
        let sink = Arc::new(RecordingTelemetry::default());
        let emitter = EventEmitter::new(sink.clone(), "s");

        let result = repair("Here is your improved prompt.", "build a CLI", &emitter).unwrap();
        assert_eq!(result.status(), "complete");
        assert_eq!(stages(&sink).last().map(|(s, _)| s.as_str()), Some("fallback"));
    }

    #[test]
    fn test_model_error_passes_through() {
        let result = repair(r#"{"status":"error","message":"nope"}"#, "idea", &EventEmitter::disabled()).unwrap();
        assert!(matches!(result, OrchestrationResult::Error { kind: ErrorKind::Unknown, .. }));
    }

    #[test]
    fn test_fenced_prompt_with_code_block_survives_funnel() {
        let raw = "```json\n{\"status\":\"complete\",\"finalPrompts\":[\"Run:\\n```sh\\ncargo test\\n```\"],\"confidence\":90}\n```";
        let result = repair(raw, "idea", &EventEmitter::disabled()).unwrap();
        assert_eq!(result.prompts().unwrap(), ["Run:\n```sh\ncargo test\n```".to_string()]);
    }

    mod properties {
        use proptest::prelude::*;
        use serde_json::{Value, json};

        use crate::domain::{
            DEFAULT_CONFIDENCE, OrchestrationResult, QuestionKind, RefinementQuestion, SuggestedApproach,
        };
        use crate::events::EventEmitter;
        use crate::repair::fallback::FALLBACK_CONFIDENCE;
        use crate::repair::repair;

        /// Plain prose: no braces, no brackets, never blank
        fn prose() -> impl Strategy<Value = String> {
            "[a-zA-Z][a-zA-Z ,.]{0,59}"
        }

        fn kind() -> impl Strategy<Value = QuestionKind> {
            prop::sample::select(vec![
                QuestionKind::Clarification,
                QuestionKind::Specification,
                QuestionKind::Scenario,
                QuestionKind::Constraint,
                QuestionKind::Example,
                QuestionKind::Priority,
            ])
        }

        fn question() -> impl Strategy<Value = (QuestionKind, String, Vec<String>, bool, bool)> {
            (
                kind(),
                "[A-Z][a-z ]{0,30}[a-z?]",
                prop::collection::hash_set("[a-z]{1,12}", 2..=4),
                any::<bool>(),
                any::<bool>(),
            )
                .prop_map(|(kind, text, answers, required, allow_custom)| {
                    (kind, text, answers.into_iter().collect(), required, allow_custom)
                })
        }

        proptest! {
            #[test]
            fn prop_prose_with_question_mark_asks_one_question(
                text in prose(),
                at in any::<prop::sample::Index>(),
                idea in prose(),
            ) {
                let mut raw = text.clone();
                raw.insert(at.index(text.len() + 1), '?');

                let result = repair(&raw, &idea, &EventEmitter::disabled()).unwrap();
                let questions = result.questions().expect("refining result");
                prop_assert_eq!(questions.len(), 1);
                prop_assert!(questions[0].answers.len() >= 2);
            }

            #[test]
            fn prop_prose_without_question_becomes_placeholders(text in prose(), idea in prose()) {
                prop_assume!(!text.to_lowercase().contains("question"));

                match repair(&text, &idea, &EventEmitter::disabled()).unwrap() {
                    OrchestrationResult::Complete { prompts, confidence, .. } => {
                        prop_assert_eq!(prompts.len(), 2);
                        prop_assert_eq!(confidence, FALLBACK_CONFIDENCE);
                        prop_assert!(prompts.iter().all(|p| p.contains(idea.trim())));
                    }
                    other => prop_assert!(false, "expected complete, got {:?}", other),
                }
            }

            #[test]
            fn prop_well_formed_refining_is_kept(items in prop::collection::vec(question(), 1..=4)) {
                let expected: Vec<RefinementQuestion> = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, (kind, text, answers, required, allow_custom))| {
                        let mut q = RefinementQuestion::new(format!("q{}", i), kind, text, answers);
                        q.required = required;
                        q.allow_custom = allow_custom;
                        q
                    })
                    .collect();
                let raw = json!({ "status": "refining", "questions": expected }).to_string();

                let result = repair(&raw, "idea", &EventEmitter::disabled()).unwrap();
                prop_assert_eq!(result, OrchestrationResult::Refining { questions: expected });
            }

            #[test]
            fn prop_well_formed_complete_is_kept(
                prompts in prop::collection::vec("[A-Za-z][A-Za-z .]{0,40}[A-Za-z.]", 1..=4),
                confidence in prop::option::of(0u8..=100),
                approach in prop::option::of(prop::sample::select(vec![
                    SuggestedApproach::Detailed,
                    SuggestedApproach::Concise,
                    SuggestedApproach::Comprehensive,
                ])),
                next_steps in prop::collection::vec("[a-z]{1,20}", 0..3),
            ) {
                let mut body = json!({ "status": "complete", "finalPrompts": prompts, "nextSteps": next_steps });
                if let Some(c) = confidence {
                    body["confidence"] = Value::from(c);
                }
                if let Some(a) = approach {
                    body["suggestedApproach"] = Value::from(a.as_str());
                }

                let result = repair(&body.to_string(), "idea", &EventEmitter::disabled()).unwrap();
                prop_assert_eq!(
                    result,
                    OrchestrationResult::Complete {
                        prompts,
                        confidence: confidence.unwrap_or(DEFAULT_CONFIDENCE),
                        approach: approach.unwrap_or_default(),
                        next_steps,
                    }
                );
            }
        }
    }
}
