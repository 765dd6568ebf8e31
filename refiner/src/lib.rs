//! Refiner - conversational prompt refinement orchestrator
//!
//! Refiner turns a rough idea into ready-to-use prompts through a short
//! question-and-answer exchange with a language model.
//!
//! # Core Concepts
//!
//! - **One request per round**: the whole conversation is replayed every time
//! - **Typed results**: every model reply becomes an [`OrchestrationResult`], however malformed
//! - **Bounded retries**: transient failures back off exponentially, everything else surfaces at once
//! - **Explicit session states**: Idle, Loading, Refining, Final, Error
//!
//! # Modules
//!
//! - [`session`] - the refinement state machine
//! - [`context`] - request building, technology knowledge, heuristics, prompt library
//! - [`llm`] - transport trait and Gemini implementation
//! - [`retry`] - retry controller with exponential backoff
//! - [`repair`] - response parsing, coercion and fallback
//! - [`collab`] - history store and credential provider
//! - [`events`] - event bus and JSONL event log
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod collab;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod events;
pub mod llm;
pub mod repair;
pub mod retry;
pub mod session;

// Re-export commonly used types
pub use collab::{
    CredentialProvider, EnvCredentials, HistoryStore, JsonHistoryStore, MemoryHistoryStore, StaticCredentials,
    StoreError,
};
pub use config::{Config, LlmConfig};
pub use context::{BuiltRequest, ContextBuilder, ContextError, LibraryEntry, Placeholders};
pub use domain::{
    AnswerSubmission, Complexity, ConversationContext, FocusArea, OrchestrationResult, OutputFormat, OutputStyle,
    Preferences, PromptHistoryItem, QuestionKind, RefinementQuestion, RefinementTurn,
};
pub use error::{ErrorKind, RefineError};
pub use events::{
    Event, EventBus, EventEmitter, EventLogEntry, EventLogger, NullTelemetry, Telemetry, create_event_bus,
    read_session_events, spawn_event_logger,
};
pub use llm::{GeminiClient, GenerationRequest, LlmClient, LlmError, create_client};
pub use retry::{RetryController, RetryPolicy, Sleeper, TokioSleeper};
pub use session::{IdeaSanitizer, MAX_IDEA_CHARS, RefinementSession, SessionError, SessionOptions, SessionState};
