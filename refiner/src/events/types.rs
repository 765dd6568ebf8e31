//! Event types for refinement activity
//!
//! These events represent all observable activity of a refinement session:
//! - Session state transitions
//! - Request building and transport attempts (including scheduled retries)
//! - Response repair stages
//! - Results and history persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Core event enum - the vocabulary of refinement activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // === Session ===
    /// The session entered a new state
    SessionChanged {
        session_id: String,
        state: String,
        round: u32,
    },
    /// A generation request was built from the conversation context
    RequestBuilt {
        session_id: String,
        round: u32,
        instruction_len: usize,
        text_len: usize,
    },

    // === Transport ===
    /// An attempt is about to be sent
    AttemptStarted {
        session_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A retry will follow after `delay_ms`
    RetryScheduled {
        session_id: String,
        attempt: u32,
        delay_ms: u64,
        retryable: bool,
    },
    /// An attempt settled with an error
    AttemptFailed {
        session_id: String,
        attempt: u32,
        kind: String,
        retryable: bool,
        message: String,
    },

    // === Repair ===
    /// A repair stage ran against the raw response
    RepairStage {
        session_id: String,
        stage: String,
        outcome: String,
        detail: String,
    },

    // === Results ===
    /// An orchestration result is available
    ResultReady { session_id: String, status: String },
    /// A completed refinement was persisted
    HistorySaved {
        session_id: String,
        id: String,
        entries: usize,
    },
}

impl Event {
    /// Get the session ID for this event
    pub fn session_id(&self) -> &str {
        match self {
            Event::SessionChanged { session_id, .. }
            | Event::RequestBuilt { session_id, .. }
            | Event::AttemptStarted { session_id, .. }
            | Event::RetryScheduled { session_id, .. }
            | Event::AttemptFailed { session_id, .. }
            | Event::RepairStage { session_id, .. }
            | Event::ResultReady { session_id, .. }
            | Event::HistorySaved { session_id, .. } => session_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::SessionChanged { .. } => "SessionChanged",
            Event::RequestBuilt { .. } => "RequestBuilt",
            Event::AttemptStarted { .. } => "AttemptStarted",
            Event::RetryScheduled { .. } => "RetryScheduled",
            Event::AttemptFailed { .. } => "AttemptFailed",
            Event::RepairStage { .. } => "RepairStage",
            Event::ResultReady { .. } => "ResultReady",
            Event::HistorySaved { .. } => "HistorySaved",
        }
    }
}

/// A timestamped event log entry for file persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: Event) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
