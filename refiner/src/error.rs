//! Orchestration error types
//!
//! Every failure that can reach the session is a [`RefineError`]. Its
//! [`ErrorKind`] decides whether the retry controller tries again; its
//! `Display` text is the message shown to the user.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{LlmError, TransportKind};

/// Classification of orchestration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential configured
    AuthMissing,
    /// Credential rejected by the remote service
    AuthInvalid,
    /// Connectivity or timeout
    Network,
    RateLimited,
    /// Overloaded or 5xx
    ServiceUnavailable,
    /// The service returned no text
    EmptyResponse,
    /// No repair stage produced a usable result
    Unparseable,
    Unknown,
}

impl ErrorKind {
    /// Transient kinds are retried by the retry controller
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::ServiceUnavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthMissing => "auth_missing",
            Self::AuthInvalid => "auth_invalid",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::EmptyResponse => "empty_response",
            Self::Unparseable => "unparseable",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors surfaced by one orchestration attempt or by the retry controller
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefineError {
    #[error("API key not found. Set the {hint} and try again.")]
    AuthMissing { hint: String },

    #[error("Your API key is not valid or has been rejected. Please check your key and update it. ({0})")]
    AuthInvalid(String),

    #[error("A network error occurred. Please check your internet connection and try again. ({0})")]
    Network(String),

    #[error("The AI service is rate limiting requests. ({0})")]
    RateLimited(String),

    #[error("The AI service is overloaded or unavailable. ({0})")]
    ServiceUnavailable(String),

    #[error("The AI returned an empty response. Please try again.")]
    EmptyResponse,

    #[error("The AI returned a malformed response that could not be read. Please try again. ({0})")]
    Unparseable(String),

    #[error("An unexpected error occurred while communicating with the AI. Details: {0}")]
    Unknown(String),

    #[error("The AI service is temporarily unavailable after {attempts} attempts. Please try again.")]
    RetriesExhausted { attempts: u32, kind: ErrorKind },
}

impl RefineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthMissing { .. } => ErrorKind::AuthMissing,
            Self::AuthInvalid(_) => ErrorKind::AuthInvalid,
            Self::Network(_) => ErrorKind::Network,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Unparseable(_) => ErrorKind::Unparseable,
            Self::Unknown(_) => ErrorKind::Unknown,
            Self::RetriesExhausted { kind, .. } => *kind,
        }
    }

    /// Whether the retry controller should try again.
    ///
    /// An exhausted retry is terminal even though its underlying kind is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExhausted { .. } => false,
            other => other.kind().is_retryable(),
        }
    }
}

impl From<LlmError> for RefineError {
    fn from(err: LlmError) -> Self {
        let detail = err.to_string();
        match err.kind() {
            TransportKind::RateLimited => Self::RateLimited(detail),
            TransportKind::ServiceUnavailable => Self::ServiceUnavailable(detail),
            TransportKind::Network => Self::Network(detail),
            TransportKind::AuthInvalid => Self::AuthInvalid(detail),
            TransportKind::Unknown => Self::Unknown(detail),
        }
    }
}
