//! Session states and rejected operations

use thiserror::Error;

use crate::collab::StoreError;
use crate::context::ContextError;
use crate::domain::{RefinementQuestion, SuggestedApproach};
use crate::error::ErrorKind;

/// Where a refinement session currently stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Waiting for an idea
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The model asked questions that need answers
    Refining { questions: Vec<RefinementQuestion> },
    /// Final prompts are ready
    Final {
        prompts: Vec<String>,
        confidence: u8,
        approach: SuggestedApproach,
        next_steps: Vec<String>,
    },
    /// The last orchestration failed
    Error { kind: ErrorKind, message: String },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Refining { .. } => "refining",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Operations the session refused. The state is left untouched.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {action} while the session is {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("The idea must not be empty")]
    EmptyIdea,

    #[error("The idea is {len} characters long (max {max})")]
    IdeaTooLong { len: usize, max: usize },

    #[error("Unknown question id '{0}'")]
    UnknownQuestion(String),

    #[error("Question '{0}' requires an answer")]
    MissingAnswer(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Context(#[from] ContextError),
}
