//! RefinementTurn - one recorded question/answer pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::{QuestionKind, RefinementQuestion};

/// Answer text recorded for optional questions left blank
pub const NO_ANSWER: &str = "No answer provided";

/// An answered question. Fields are private so a recorded turn cannot change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementTurn {
    id: String,
    question_id: String,
    question: String,
    #[serde(rename = "questionType")]
    kind: QuestionKind,
    answer: String,
    required: bool,
    round: u32,
    timestamp: DateTime<Utc>,
}

impl RefinementTurn {
    /// Record an answer to `question` given during `round`
    pub fn record(question: &RefinementQuestion, answer: impl Into<String>, round: u32) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            question_id: question.id.clone(),
            question: question.question.clone(),
            kind: question.kind,
            answer: answer.into(),
            required: question.required,
            round,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_copies_question_fields() {
        let q = RefinementQuestion::new("lang", QuestionKind::Specification, "Which language?", vec![]).required();
        let turn = RefinementTurn::record(&q, "Python", 2);

        assert_eq!(turn.question_id(), "lang");
        assert_eq!(turn.question(), "Which language?");
        assert_eq!(turn.kind(), QuestionKind::Specification);
        assert_eq!(turn.answer(), "Python");
        assert!(turn.required());
        assert_eq!(turn.round(), 2);
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let q = RefinementQuestion::new("q", QuestionKind::Clarification, "?", vec![]);
        let a = RefinementTurn::record(&q, "x", 1);
        let b = RefinementTurn::record(&q, "x", 1);
        assert_ne!(a.id(), b.id());
    }
}
