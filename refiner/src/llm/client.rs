//! LlmClient trait definition

use async_trait::async_trait;

use super::{GenerationRequest, LlmError};

/// Stateless transport - each call is independent
///
/// Sends one structured generation request and returns the raw response text.
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single generation request using `credential` for authentication
    async fn complete(&self, credential: &str, request: &GenerationRequest) -> Result<String, LlmError>;
}
