//! Refinement session state machine

mod input;
mod machine;
mod state;

pub use input::{IdeaSanitizer, MAX_IDEA_CHARS};
pub use machine::{RefinementSession, SessionOptions};
pub use state::{SessionError, SessionState};
