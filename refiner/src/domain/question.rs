//! Refinement questions posed by the model

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum number of suggested answers per question
pub const MIN_ANSWERS: usize = 2;

/// Maximum number of suggested answers per question
pub const MAX_ANSWERS: usize = 4;

/// Maximum number of questions in one batch
pub const MAX_QUESTIONS: usize = 4;

/// Closed set of question kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Clarification,
    Specification,
    Scenario,
    Constraint,
    Example,
    Priority,
}

impl QuestionKind {
    /// Parse a kind tag leniently (case-insensitive, surrounding whitespace ignored)
    pub fn parse(tag: &str) -> Option<Self> {
        debug!(%tag, "QuestionKind::parse: called");
        match tag.trim().to_ascii_lowercase().as_str() {
            "clarification" => Some(Self::Clarification),
            "specification" => Some(Self::Specification),
            "scenario" => Some(Self::Scenario),
            "constraint" => Some(Self::Constraint),
            "example" => Some(Self::Example),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clarification => "clarification",
            Self::Specification => "specification",
            Self::Scenario => "scenario",
            Self::Constraint => "constraint",
            Self::Example => "example",
            Self::Priority => "priority",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single question in a refinement batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    /// Suggested answers (2-4)
    pub answers: Vec<String>,
    pub allow_custom: bool,
    pub required: bool,
    /// Ids of other questions in the same batch
    pub depends_on: Vec<String>,
}

impl RefinementQuestion {
    /// Create a question with defaulted flags
    pub fn new(id: impl Into<String>, kind: QuestionKind, question: impl Into<String>, answers: Vec<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            question: question.into(),
            answers,
            allow_custom: true,
            required: false,
            depends_on: Vec::new(),
        }
    }

    /// Mark the question as mandatory
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declare dependencies on other question ids
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Forbid free-text answers
    pub fn closed(mut self) -> Self {
        self.allow_custom = false;
        self
    }
}

/// One answer sent back by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    pub answer: String,
}

impl AnswerSubmission {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_kind_parse() {
        assert_eq!(QuestionKind::parse("scenario"), Some(QuestionKind::Scenario));
        assert_eq!(QuestionKind::parse(" Priority "), Some(QuestionKind::Priority));
        assert_eq!(QuestionKind::parse("CONSTRAINT"), Some(QuestionKind::Constraint));
        assert_eq!(QuestionKind::parse("followup"), None);
    }

    #[test]
    fn test_question_serializes_with_wire_names() {
        let q = RefinementQuestion::new("q1", QuestionKind::Example, "Which?", vec!["a".into(), "b".into()])
            .required()
            .depends_on(["q0"]);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "example");
        assert_eq!(json["allowCustom"], true);
        assert_eq!(json["required"], true);
        assert_eq!(json["dependsOn"][0], "q0");
    }

    #[test]
    fn test_closed_question() {
        let q = RefinementQuestion::new("q1", QuestionKind::Clarification, "?", vec![]).closed();
        assert!(!q.allow_custom);
    }
}
