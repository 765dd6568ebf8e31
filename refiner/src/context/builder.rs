//! Conversation Context Builder
//!
//! Renders the conversational text and the system instruction for the next
//! request. Output depends only on the context: no clock, no randomness.

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::ContextError;
use super::heuristics::{Estimate, Estimator};
use super::stacks;
use crate::domain::{Complexity, ConversationContext};

/// Instruction template compiled into the binary
pub const INSTRUCTION_TEMPLATE: &str = include_str!("../../prompts/instruction.pmt");

/// Contextual questions listed in the opening instruction
const MAX_SUGGESTED_QUESTIONS: usize = 6;

/// Base system instruction used unless the configuration replaces it
pub const DEFAULT_BASE_INSTRUCTION: &str = r#"You are an expert-level AI prompt engineer. Your primary goal is to help a user refine a basic prompt idea into a final, detailed, and effective prompt through a conversational process.

Your process is as follows:
1.  Analyze the user's initial prompt idea and the ongoing conversation.
2.  If you need more information to create a high-quality final prompt, ask up to 4 clarifying questions. Each question must come with 2-4 concise, clickable suggested answers.
3.  If you have sufficient information, generate 2 distinct, final, well-structured prompts in the user-specified format.

Your JSON output MUST match one of two schemas:
- For asking questions: {"status": "refining", "questions": [{"id": "...", "type": "clarification", "question": "...", "answers": ["...", "...", "..."]}]}
- For providing the final prompt: {"status": "complete", "finalPrompts": ["...", "..."], "confidence": 90, "suggestedApproach": "comprehensive", "nextSteps": ["..."]}"#;

/// Text pair sent to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    /// Conversational text: idea plus prior turns
    pub text: String,
    pub instruction: String,
}

#[derive(Debug, Serialize)]
struct FocusLine {
    name: String,
    percent: u32,
}

#[derive(Debug, Serialize)]
struct InstructionData {
    round: u32,
    max_rounds: u32,
    first_round: bool,
    final_round: bool,
    estimate: Estimate,
    stacks: String,
    practices: Vec<&'static str>,
    issues: Vec<&'static str>,
    suggested_questions: Vec<String>,
    focus: Vec<FocusLine>,
    complexity: &'static str,
    complexity_hint: &'static str,
    style: &'static str,
    format: &'static str,
}

/// Builds request text from a [`ConversationContext`]
pub struct ContextBuilder {
    hbs: Handlebars<'static>,
    base_instruction: String,
    estimator: Estimator,
}

impl ContextBuilder {
    pub fn new() -> Result<Self, ContextError> {
        debug!("ContextBuilder::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Ok(Self {
            hbs,
            base_instruction: DEFAULT_BASE_INSTRUCTION.to_string(),
            estimator: Estimator::new()?,
        })
    }

    /// Replace the base instruction (blank input keeps the default)
    pub fn with_base_instruction(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        if !base.trim().is_empty() {
            self.base_instruction = base;
        }
        self
    }

    pub fn build(&self, context: &ConversationContext) -> Result<BuiltRequest, ContextError> {
        debug!(round = context.round(), turns = context.turns().len(), "build: called");
        let text = conversation_text(context);
        let instruction = self.instruction(context)?;
        debug!(text_len = text.len(), instruction_len = instruction.len(), "build: done");
        Ok(BuiltRequest { text, instruction })
    }

    fn instruction(&self, context: &ConversationContext) -> Result<String, ContextError> {
        let selected = context.stacks();
        let first_round = context.round() <= 1;

        let suggested_questions = if first_round {
            stacks::contextual_questions(selected)
                .into_iter()
                .take(MAX_SUGGESTED_QUESTIONS)
                .map(|q| q.question)
                .collect()
        } else {
            Vec::new()
        };

        let data = InstructionData {
            round: context.round(),
            max_rounds: context.max_rounds(),
            first_round,
            final_round: context.is_final_round(),
            estimate: self
                .estimator
                .estimate(context.idea(), selected.len(), context.max_rounds()),
            stacks: selected.iter().cloned().collect::<Vec<_>>().join(", "),
            practices: stacks::best_practices(selected),
            issues: stacks::common_issues(selected),
            suggested_questions,
            focus: focus_lines(context),
            complexity: context.complexity().as_str(),
            complexity_hint: complexity_hint(context.complexity()),
            style: context.style().as_str(),
            format: context.format().label(),
        };

        let rendered = self.hbs.render_template(INSTRUCTION_TEMPLATE, &data)?;
        Ok(format!("{}\n\n{}", self.base_instruction.trim_end(), rendered.trim_end()))
    }
}

/// The idea, every prior turn, and the closing request
pub fn conversation_text(context: &ConversationContext) -> String {
    let mut text = format!("The user's initial idea is: \"{}\"\n\n", context.idea());

    if context.round() <= 1 || context.turns().is_empty() {
        text.push_str("This is the first step. What questions do you have?");
        return text;
    }

    text.push_str("Here is the conversation so far:\n");
    for turn in context.turns() {
        text.push_str(&format!(
            "[Round {}] ({}) Q: {}\nA: {}\n",
            turn.round(),
            turn.kind(),
            turn.question(),
            turn.answer()
        ));
    }
    text.push_str("\nBased on this, what is the next step?");
    text
}

/// Enabled focus areas with their share of the total enabled weight
fn focus_lines(context: &ConversationContext) -> Vec<FocusLine> {
    let enabled: Vec<_> = context.focus_areas().iter().filter(|f| f.enabled && f.weight > 0).collect();
    let total: u64 = enabled.iter().map(|f| u64::from(f.weight)).sum();
    if total == 0 {
        return Vec::new();
    }
    enabled
        .into_iter()
        .map(|f| FocusLine {
            name: f.name.clone(),
            // At most 100, so the narrowing cannot truncate
            percent: ((u64::from(f.weight) * 100 + total / 2) / total) as u32,
        })
        .collect()
}

fn complexity_hint(complexity: Complexity) -> &'static str {
    match complexity {
        Complexity::Basic => "short, focused prompts",
        Complexity::Detailed => "prompts with context, constraints and expected output",
        Complexity::Comprehensive => "exhaustive prompts covering edge cases and acceptance criteria",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FocusArea, OutputFormat, Preferences, QuestionKind, RefinementQuestion, RefinementTurn};
    use proptest::prelude::*;

    fn builder() -> ContextBuilder {
        ContextBuilder::new().unwrap()
    }

    fn context(idea: &str) -> ConversationContext {
        ConversationContext::new(idea, Preferences::default())
    }

    #[test]
    fn test_first_round_text() {
        let built = builder().build(&context("write unit tests")).unwrap();
        assert_eq!(
            built.text,
            "The user's initial idea is: \"write unit tests\"\n\nThis is the first step. What questions do you have?"
        );
        assert!(built.instruction.contains("Ask 2-3 foundational questions"));
        assert!(built.instruction.contains("This is round 1 of at most 5."));
    }

    #[test]
    fn test_later_round_replays_turns() {
        let mut ctx = context("write unit tests");
        let q = RefinementQuestion::new(
            "lang",
            QuestionKind::Specification,
            "Which language?",
            vec!["Python".to_string(), "Rust".to_string()],
        );
        ctx.advance(vec![RefinementTurn::record(&q, "Python", 1)]);

        let built = builder().build(&ctx).unwrap();
        assert!(built.text.contains("[Round 1] (specification) Q: Which language?\nA: Python\n"));
        assert!(built.text.ends_with("Based on this, what is the next step?"));
        assert!(!built.instruction.contains("foundational questions"));
        assert!(built.instruction.contains("This is round 2 of at most 5."));
    }

    #[test]
    fn test_final_round_demands_complete() {
        let prefs = Preferences {
            max_rounds: 1,
            ..Preferences::default()
        };
        let built = builder().build(&ConversationContext::new("idea", prefs)).unwrap();
        assert!(built.instruction.contains("You MUST respond with status 'complete'"));
    }

    #[test]
    fn test_stack_knowledge_rendered_unescaped() {
        let prefs = Preferences {
            stacks: ["TypeScript", "React"].iter().map(|s| s.to_string()).collect(),
            format: OutputFormat::Json,
            ..Preferences::default()
        };
        let built = builder().build(&ConversationContext::new("build a dashboard", prefs)).unwrap();

        assert!(built.instruction.contains(
            "CRITICAL: The user is working with the following technology stack: React, TypeScript."
        ));
        assert!(built.instruction.contains("- Use React.FC for functional components"));
        assert!(built.instruction.contains("- Leverage TypeScript's type inference"));
        assert!(built.instruction.contains("How are you setting up React with TypeScript?"));
        assert!(built.instruction.contains("you MUST format them as JSON."));
    }

    #[test]
    fn test_focus_weights_as_percentages() {
        let prefs = Preferences {
            focus_areas: vec![
                FocusArea::new("a", "Alpha", 3),
                FocusArea::new("b", "Beta", 1),
                FocusArea {
                    enabled: false,
                    ..FocusArea::new("c", "Gamma", 5)
                },
            ],
            ..Preferences::default()
        };
        let built = builder().build(&ConversationContext::new("idea", prefs)).unwrap();
        assert!(built.instruction.contains("- Alpha: 75%"));
        assert!(built.instruction.contains("- Beta: 25%"));
        assert!(!built.instruction.contains("Gamma"));
    }

    #[test]
    fn test_focus_weights_near_u32_max() {
        let prefs = Preferences {
            focus_areas: vec![
                FocusArea::new("a", "Alpha", u32::MAX),
                FocusArea::new("b", "Beta", u32::MAX),
                FocusArea::new("c", "Gamma", 50_000_000),
            ],
            ..Preferences::default()
        };
        let built = builder().build(&ConversationContext::new("idea", prefs)).unwrap();
        assert!(built.instruction.contains("- Alpha: 50%"));
        assert!(built.instruction.contains("- Gamma: 1%"));
    }

    #[test]
    fn test_base_instruction_override() {
        let built = builder()
            .with_base_instruction("You are terse.")
            .build(&context("idea"))
            .unwrap();
        assert!(built.instruction.starts_with("You are terse.\n\n## Session"));

        let built = builder().with_base_instruction("   ").build(&context("idea")).unwrap();
        assert!(built.instruction.starts_with("You are an expert-level AI prompt engineer."));
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(
            idea in ".{1,80}",
            stacks in proptest::collection::btree_set("(React|TypeScript|Node.js|Python|Docker|Elm)", 0..4),
        ) {
            let prefs = Preferences { stacks, ..Preferences::default() };
            let ctx = ConversationContext::new(idea, prefs);
            let a = builder().build(&ctx).unwrap();
            let b = builder().build(&ctx).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
