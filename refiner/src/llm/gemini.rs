//! Gemini API client implementation
//!
//! Implements the LlmClient trait for the `generateContent` endpoint with
//! JSON structured output. One call, one HTTP request: no retries here.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{GenerationRequest, LlmClient, LlmError};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        debug!(model = %request.model, "build_request_body: called");
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.contents }],
            }],
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }],
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
                "maxOutputTokens": request.max_output_tokens,
            },
        })
    }

    /// Concatenate the text parts of the first candidate
    fn parse_response(&self, api_response: GeminiResponse) -> String {
        let Some(candidate) = api_response.candidates.into_iter().next() else {
            debug!("parse_response: no candidates");
            return String::new();
        };
        if let Some(reason) = &candidate.finish_reason {
            debug!(%reason, "parse_response: finish reason");
        }
        candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default()
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            debug!("map_send_error: timeout");
            LlmError::Timeout(self.timeout)
        } else if err.is_decode() {
            debug!(error = %err, "map_send_error: undecodable body");
            LlmError::InvalidResponse(err.to_string())
        } else {
            debug!(error = %err, "map_send_error: network error");
            LlmError::Network(err)
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, credential: &str, request: &GenerationRequest) -> Result<String, LlmError> {
        debug!(model = %request.model, "complete: called");
        let body = self.build_request_body(request);

        let response = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", credential)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!(?retry_after, "complete: rate limited (429)");
            return Err(LlmError::RateLimited { retry_after });
        }

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            debug!(%status, %message, "complete: API error");
            return Err(LlmError::ApiError { status, message });
        }

        let api_response: GeminiResponse = response.json().await.map_err(|e| self.map_send_error(e))?;
        let text = self.parse_response(api_response);
        debug!(text_len = text.len(), "complete: success");
        Ok(text)
    }
}

/// Pull `error.message` (and `error.status`) out of a Gemini error body
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<GeminiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{} ({})", parsed.error.message, status),
            None => parsed.error.message,
        },
        Err(_) => body.to_string(),
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: Client::new(),
            timeout: Duration::from_secs(120),
        }
    }

    #[test]
    fn test_build_request_body() {
        let request = GenerationRequest::new("gemini-2.5-pro", "The idea", "You are helpful", 2048);
        let body = client().build_request_body(&request);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "The idea");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are helpful");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert!(body["generationConfig"]["responseSchema"].is_object());
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"status\":"},{"text":"\"complete\"}"}]},"finishReason":"STOP"}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(client().parse_response(parsed), r#"{"status":"complete"}"#);
    }

    #[test]
    fn test_parse_response_without_candidates_is_empty() {
        let parsed: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(client().parse_response(parsed), "");
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_error_message(body),
            "API key not valid. Please pass a valid API key. (INVALID_ARGUMENT)"
        );
        assert_eq!(extract_error_message("plain failure"), "plain failure");
    }
}
