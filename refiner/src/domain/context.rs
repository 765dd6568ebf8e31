//! ConversationContext - accumulated state that drives the next request

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::turn::RefinementTurn;

/// Desired depth of the final prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    Basic,
    #[default]
    Detailed,
    Comprehensive,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "detailed" => Ok(Self::Detailed),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(format!("unknown complexity '{}' (basic, detailed, comprehensive)", other)),
        }
    }
}

/// Tone of the final prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputStyle {
    #[default]
    Professional,
    Casual,
    Technical,
    Educational,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Casual => "casual",
            Self::Technical => "technical",
            Self::Educational => "educational",
        }
    }
}

impl std::str::FromStr for OutputStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "casual" => Ok(Self::Casual),
            "technical" => Ok(Self::Technical),
            "educational" => Ok(Self::Educational),
            other => Err(format!(
                "unknown style '{}' (professional, casual, technical, educational)",
                other
            )),
        }
    }
}

/// Format the final prompts must be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    PlainText,
}

impl OutputFormat {
    /// Name used inside the system instruction
    pub fn label(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::Json => "JSON",
            Self::PlainText => "Plain Text",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "plain-text" | "plain" | "text" => Ok(Self::PlainText),
            other => Err(format!("unknown format '{}' (markdown, json, plain-text)", other)),
        }
    }
}

/// A user-weighted topic that shapes question and prompt emphasis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusArea {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub weight: u32,
}

/// Largest weight a focus area may carry
pub const MAX_FOCUS_WEIGHT: u32 = 1000;

impl Default for FocusArea {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            enabled: true,
            weight: 1,
        }
    }
}

impl FocusArea {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            weight,
        }
    }

    fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The built-in focus areas
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("technical-depth", "Technical depth", 3),
            Self::new("business-context", "Business framing", 2),
            Self::new("user-experience", "User experience", 2),
            Self::new("performance", "Performance", 1).disabled(),
            Self::new("security", "Security", 1).disabled(),
        ]
    }
}

/// Session preferences that stay fixed for one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub max_rounds: u32,
    pub complexity: Complexity,
    pub style: OutputStyle,
    pub format: OutputFormat,
    pub stacks: BTreeSet<String>,
    pub focus_areas: Vec<FocusArea>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            complexity: Complexity::default(),
            style: OutputStyle::default(),
            format: OutputFormat::default(),
            stacks: BTreeSet::new(),
            focus_areas: FocusArea::defaults(),
        }
    }
}

/// Everything the next request is built from.
///
/// The idea never changes for a session; turns are append-only and the round
/// only moves forward.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    idea: String,
    turns: Vec<RefinementTurn>,
    round: u32,
    prefs: Preferences,
}

impl ConversationContext {
    /// Start a context at round 1 with no turns
    pub fn new(idea: impl Into<String>, prefs: Preferences) -> Self {
        let idea = idea.into();
        debug!(idea_len = idea.len(), max_rounds = prefs.max_rounds, "ConversationContext::new: called");
        Self {
            idea,
            turns: Vec::new(),
            round: 1,
            prefs,
        }
    }

    pub fn idea(&self) -> &str {
        &self.idea
    }

    pub fn turns(&self) -> &[RefinementTurn] {
        &self.turns
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.prefs.max_rounds
    }

    pub fn is_final_round(&self) -> bool {
        self.round >= self.prefs.max_rounds
    }

    pub fn stacks(&self) -> &BTreeSet<String> {
        &self.prefs.stacks
    }

    pub fn complexity(&self) -> Complexity {
        self.prefs.complexity
    }

    pub fn style(&self) -> OutputStyle {
        self.prefs.style
    }

    pub fn format(&self) -> OutputFormat {
        self.prefs.format
    }

    pub fn focus_areas(&self) -> &[FocusArea] {
        &self.prefs.focus_areas
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Append one answered batch and advance to the next round
    pub(crate) fn advance(&mut self, batch: Vec<RefinementTurn>) {
        debug!(batch_len = batch.len(), round = self.round, "ConversationContext::advance: called");
        self.turns.extend(batch);
        self.round = self.round.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuestionKind, RefinementQuestion};

    #[test]
    fn test_new_context_starts_at_round_one() {
        let ctx = ConversationContext::new("write unit tests", Preferences::default());
        assert_eq!(ctx.round(), 1);
        assert!(ctx.turns().is_empty());
        assert_eq!(ctx.idea(), "write unit tests");
    }

    #[test]
    fn test_advance_appends_and_increments() {
        let mut ctx = ConversationContext::new("idea", Preferences::default());
        let q = RefinementQuestion::new("q1", QuestionKind::Clarification, "Why?", vec![]);
        ctx.advance(vec![RefinementTurn::record(&q, "because", 1)]);
        assert_eq!(ctx.round(), 2);
        assert_eq!(ctx.turns().len(), 1);

        ctx.advance(vec![]);
        assert_eq!(ctx.round(), 3);
        assert_eq!(ctx.turns().len(), 1);
    }

    #[test]
    fn test_final_round() {
        let prefs = Preferences {
            max_rounds: 2,
            ..Preferences::default()
        };
        let mut ctx = ConversationContext::new("idea", prefs);
        assert!(!ctx.is_final_round());
        ctx.advance(vec![]);
        assert!(ctx.is_final_round());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Comprehensive".parse::<Complexity>(), Ok(Complexity::Comprehensive));
        assert_eq!("plain".parse::<OutputFormat>(), Ok(OutputFormat::PlainText));
        assert!("loud".parse::<OutputStyle>().is_err());
    }

    #[test]
    fn test_default_focus_areas() {
        let areas = FocusArea::defaults();
        assert!(areas.iter().any(|a| a.id == "technical-depth" && a.enabled));
        assert!(areas.iter().any(|a| a.id == "security" && !a.enabled));
    }
}
