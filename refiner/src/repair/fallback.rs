//! Stage 3: heuristic fallback
//!
//! Runs when nothing structured could be recovered. Text that looks like a
//! question becomes one clarification question; anything else becomes a
//! complete result with placeholder prompts built from the idea. Never fails.

use tracing::warn;

use crate::domain::{OrchestrationResult, QuestionKind, RefinementQuestion, SuggestedApproach};

/// Confidence reported for synthesized prompts
pub const FALLBACK_CONFIDENCE: u8 = 60;

/// Longest line of raw text reused as question text
const MAX_QUESTION_LEN: usize = 300;

pub fn synthesize(raw: &str, idea: &str) -> OrchestrationResult {
    if looks_like_question(raw) {
        warn!("synthesize: falling back to a generic clarification question");
        return OrchestrationResult::Refining {
            questions: vec![fallback_question(raw)],
        };
    }

    warn!("synthesize: falling back to placeholder prompts");
    let idea = idea.trim();
    OrchestrationResult::Complete {
        prompts: vec![
            format!(
                "Act as an expert assistant. {}\n\nProvide a thorough, well-structured response with clear steps and examples.",
                idea
            ),
            format!(
                "You are a senior specialist. Help me with the following task: {}\n\nStart by outlining your approach, then deliver the complete result.",
                idea
            ),
        ],
        confidence: FALLBACK_CONFIDENCE,
        approach: SuggestedApproach::default(),
        next_steps: Vec::new(),
    }
}

fn looks_like_question(raw: &str) -> bool {
    raw.contains('?') || raw.to_lowercase().contains("question")
}

/// Reuse a question line from the raw text when there is a short one
fn fallback_question(raw: &str) -> RefinementQuestion {
    let text = raw
        .lines()
        .map(str::trim)
        .find(|line| line.ends_with('?') && line.chars().count() <= MAX_QUESTION_LEN)
        .unwrap_or("What is the most important outcome you want from this prompt?");

    RefinementQuestion::new(
        "question-1",
        QuestionKind::Clarification,
        text,
        vec![
            "A detailed step-by-step plan".to_string(),
            "Working code with explanations".to_string(),
            "A concise summary".to_string(),
        ],
    )
}
