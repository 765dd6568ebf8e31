//! Conversation context builder
//!
//! Turns the accumulated [`ConversationContext`](crate::domain::ConversationContext)
//! into the text pair for the next request, using the technology knowledge
//! table and the opening-round heuristics. Also home to the starter prompt
//! library that can seed an idea.

use thiserror::Error;

mod builder;
pub mod heuristics;
pub mod library;
pub mod stacks;

pub use builder::{BuiltRequest, ContextBuilder, DEFAULT_BASE_INSTRUCTION, INSTRUCTION_TEMPLATE, conversation_text};
pub use heuristics::{Estimate, Estimator};
pub use library::{EntryKind, LibraryEntry, Placeholder, Placeholders};

/// Failures while building a request
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to render instruction template: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}
