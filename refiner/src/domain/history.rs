//! PromptHistoryItem - a finished refinement kept for later reuse

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::turn::RefinementTurn;

/// A completed session: the idea, every turn, and the final prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptHistoryItem {
    pub id: String,
    #[serde(rename = "originalPrompt")]
    pub idea: String,
    #[serde(rename = "conversationHistory")]
    pub turns: Vec<RefinementTurn>,
    #[serde(rename = "finalPrompts")]
    pub prompts: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PromptHistoryItem {
    pub fn new(idea: impl Into<String>, turns: Vec<RefinementTurn>, prompts: Vec<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            idea: idea.into(),
            turns,
            prompts,
            timestamp: Utc::now(),
        }
    }

    /// First line of the idea, truncated for list views
    pub fn title(&self, max_chars: usize) -> String {
        let first = self.idea.lines().next().unwrap_or_default().trim();
        if first.chars().count() <= max_chars {
            first.to_string()
        } else {
            let cut: String = first.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut)
        }
    }
}
