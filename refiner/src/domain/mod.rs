//! Domain types for Refiner
//!
//! Core domain types: questions, turns, the conversation context, the
//! canonical orchestration result, and persisted history entries.

mod context;
mod history;
mod question;
mod result;
mod turn;

pub use context::{
    Complexity, ConversationContext, FocusArea, MAX_FOCUS_WEIGHT, OutputFormat, OutputStyle, Preferences,
};
pub use history::PromptHistoryItem;
pub use question::{AnswerSubmission, MAX_ANSWERS, MAX_QUESTIONS, MIN_ANSWERS, QuestionKind, RefinementQuestion};
pub use result::{DEFAULT_CONFIDENCE, OrchestrationResult, SuggestedApproach};
pub use turn::{NO_ANSWER, RefinementTurn};
