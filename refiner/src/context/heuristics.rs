//! Keyword heuristics for the opening round
//!
//! Produces a rough complexity estimate from the idea text and the number of
//! selected technologies. The estimate is rendered into the instruction as a
//! hint and never constrains the session.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

const COMPLEX_PATTERN: &str = r"(?i)\b(architect\w*|distributed|microservices?|scal\w*|secur\w*|auth\w*|databases?|migrat\w*|performance|concurren\w*|real-?time|integrat\w*|pipelines?|deploy\w*|enterprise|compliance|multi-?tenant)\b";

const SIMPLE_PATTERN: &str = r"(?i)\b(simple|basic|quick|small|tiny|example|snippet|hello world|one-?liner|beginner)\b";

/// Rough shape of the work behind an idea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Estimate {
    /// 1 (trivial) to 10 (very involved)
    pub complexity_score: u8,
    pub estimated_rounds: u32,
    /// 0-100
    pub initial_confidence: u8,
}

pub struct Estimator {
    complex: Regex,
    simple: Regex,
}

impl Estimator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            complex: Regex::new(COMPLEX_PATTERN)?,
            simple: Regex::new(SIMPLE_PATTERN)?,
        })
    }

    pub fn estimate(&self, idea: &str, stack_count: usize, max_rounds: u32) -> Estimate {
        let complex = self.complex.find_iter(idea).count() as i64;
        let simple = self.simple.find_iter(idea).count() as i64;
        let words = idea.split_whitespace().count() as i64;
        debug!(complex, simple, words, stack_count, "estimate: called");

        let score = (3 + complex * 2 - simple + stack_count as i64 + words / 40).clamp(1, 10);
        let rounds = (1 + score / 3).clamp(1, i64::from(max_rounds.max(1)));
        let confidence = (90 - score * 5).clamp(40, 90);

        Estimate {
            complexity_score: score as u8,
            estimated_rounds: rounds as u32,
            initial_confidence: confidence as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> Estimator {
        Estimator::new().unwrap()
    }

    #[test]
    fn test_simple_idea_scores_low() {
        let e = estimator().estimate("a simple hello world example", 0, 5);
        assert!(e.complexity_score <= 2);
        assert_eq!(e.estimated_rounds, 1);
        assert!(e.initial_confidence >= 80);
    }

    #[test]
    fn test_complex_idea_scores_high() {
        let e = estimator().estimate(
            "design a distributed, secure microservices architecture with database migrations",
            3,
            5,
        );
        assert_eq!(e.complexity_score, 10);
        assert_eq!(e.estimated_rounds, 4);
        assert_eq!(e.initial_confidence, 40);
    }

    #[test]
    fn test_rounds_capped_by_max_rounds() {
        let e = estimator().estimate("distributed secure scalable realtime pipeline", 4, 2);
        assert_eq!(e.estimated_rounds, 2);
    }

    #[test]
    fn test_stacks_raise_score() {
        let none = estimator().estimate("write unit tests", 0, 5);
        let some = estimator().estimate("write unit tests", 2, 5);
        assert!(some.complexity_score > none.complexity_score);
    }
}
