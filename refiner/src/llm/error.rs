//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Classification hint attached to every transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    RateLimited,
    ServiceUnavailable,
    Network,
    AuthInvalid,
    Unknown,
}

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Markers the service uses when a key is rejected
const AUTH_MARKERS: &[&str] = &["api key not valid", "permission_denied", "api_key_invalid", "unauthenticated"];

/// Markers the service uses when it is overloaded
const OVERLOAD_MARKERS: &[&str] = &["overloaded", "unavailable", "resource_exhausted"];

impl LlmError {
    /// Classify this error for the retry controller
    pub fn kind(&self) -> TransportKind {
        match self {
            LlmError::RateLimited { .. } => TransportKind::RateLimited,
            LlmError::ApiError { status, message } => classify_status(*status, message),
            LlmError::Network(_) => TransportKind::Network,
            LlmError::Timeout(_) => TransportKind::Network,
            LlmError::InvalidResponse(_) => TransportKind::Unknown,
        }
    }
}

fn classify_status(status: u16, message: &str) -> TransportKind {
    let lower = message.to_lowercase();
    if status == 401 || status == 403 || AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        return TransportKind::AuthInvalid;
    }
    match status {
        429 => TransportKind::RateLimited,
        408 => TransportKind::Network,
        500..=599 => TransportKind::ServiceUnavailable,
        _ if OVERLOAD_MARKERS.iter().any(|m| lower.contains(m)) => TransportKind::ServiceUnavailable,
        _ => TransportKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> LlmError {
        LlmError::ApiError {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_transient_kinds() {
        let limited = LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(limited.kind(), TransportKind::RateLimited);
        assert_eq!(api(429, "Too many requests").kind(), TransportKind::RateLimited);
        assert_eq!(api(500, "Server error").kind(), TransportKind::ServiceUnavailable);
        assert_eq!(api(503, "The model is overloaded").kind(), TransportKind::ServiceUnavailable);
        assert_eq!(LlmError::Timeout(Duration::from_secs(30)).kind(), TransportKind::Network);
    }

    #[test]
    fn test_permanent_kinds() {
        assert_eq!(api(400, "Bad request").kind(), TransportKind::Unknown);
        assert_eq!(
            LlmError::InvalidResponse("Bad JSON".to_string()).kind(),
            TransportKind::Unknown
        );
    }

    #[test]
    fn test_auth_classification() {
        assert_eq!(
            api(400, "API key not valid. Please pass a valid API key.").kind(),
            TransportKind::AuthInvalid
        );
        assert_eq!(api(403, "forbidden").kind(), TransportKind::AuthInvalid);
        assert_eq!(api(401, "").kind(), TransportKind::AuthInvalid);
        assert_eq!(api(200, "PERMISSION_DENIED").kind(), TransportKind::AuthInvalid);
    }

    #[test]
    fn test_overload_message_without_5xx() {
        assert_eq!(
            api(400, "status: UNAVAILABLE, try later").kind(),
            TransportKind::ServiceUnavailable
        );
        assert_eq!(api(418, "teapot").kind(), TransportKind::Unknown);
        assert_eq!(api(408, "request timeout").kind(), TransportKind::Network);
    }
}
