//! OrchestrationResult - the canonical shape of every model response

use serde::{Deserialize, Serialize};

use super::question::RefinementQuestion;
use crate::error::ErrorKind;

/// Confidence assumed when the model omits it
pub const DEFAULT_CONFIDENCE: u8 = 85;

/// Authoring approach the model suggests for the final prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedApproach {
    Detailed,
    Concise,
    #[default]
    Comprehensive,
}

impl SuggestedApproach {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "detailed" => Some(Self::Detailed),
            "concise" => Some(Self::Concise),
            "comprehensive" => Some(Self::Comprehensive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Concise => "concise",
            Self::Comprehensive => "comprehensive",
        }
    }
}

/// Normalized result of one orchestration attempt.
///
/// Refining and complete payloads are separate variants, so a result can never
/// carry both questions and final prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrchestrationResult {
    /// The model needs answers to 1-4 questions
    Refining { questions: Vec<RefinementQuestion> },
    /// The model produced final prompts
    Complete {
        prompts: Vec<String>,
        /// 0-100
        confidence: u8,
        approach: SuggestedApproach,
        next_steps: Vec<String>,
    },
    /// The attempt failed
    Error { message: String, kind: ErrorKind },
}

impl OrchestrationResult {
    /// Build a complete result with defaulted metadata
    pub fn complete(prompts: Vec<String>) -> Self {
        Self::Complete {
            prompts,
            confidence: DEFAULT_CONFIDENCE,
            approach: SuggestedApproach::default(),
            next_steps: Vec::new(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Refining { .. } => "refining",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    pub fn questions(&self) -> Option<&[RefinementQuestion]> {
        match self {
            Self::Refining { questions } => Some(questions),
            _ => None,
        }
    }

    pub fn prompts(&self) -> Option<&[String]> {
        match self {
            Self::Complete { prompts, .. } => Some(prompts),
            _ => None,
        }
    }
}
