//! Answers gathered across turns of the guided intake.

use serde::{Deserialize, Serialize};

/// State of a single intake question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Not asked yet.
    #[default]
    NotAsked,
    /// Asked, waiting for the shopper's reply.
    Pending,
    /// Answered; stored lowercased.
    Answered(String),
}

impl Answer {
    /// The answer, if given.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Answered(value) => Some(value),
            Self::NotAsked | Self::Pending => None,
        }
    }

    /// Whether an answer has been recorded.
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }
}

/// The engine's memory of the shopper's answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collected {
    pub skin_type: Answer,
    pub budget: Answer,
}

impl Collected {
    /// Both questions answered; the intake has nothing left to ask.
    pub fn is_complete(&self) -> bool {
        self.skin_type.is_answered() && self.budget.is_answered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_states() {
        assert_eq!(Answer::default(), Answer::NotAsked);
        assert!(Answer::Pending.value().is_none());
        assert_eq!(Answer::Answered("oily".into()).value(), Some("oily"));
        assert!(!Answer::Pending.is_answered());
    }

    #[test]
    fn test_collected_completion() {
        let mut collected = Collected::default();
        assert!(!collected.is_complete());
        collected.skin_type = Answer::Answered("dry".into());
        assert!(!collected.is_complete());
        collected.budget = Answer::Answered("50".into());
        assert!(collected.is_complete());
    }

    #[test]
    fn test_collected_serialization() {
        let collected = Collected {
            skin_type: Answer::Answered("oily".into()),
            budget: Answer::Pending,
        };
        let json = serde_json::to_value(&collected).unwrap();
        assert_eq!(json["skin_type"]["state"], "answered");
        assert_eq!(json["skin_type"]["value"], "oily");
        assert_eq!(json["budget"]["state"], "pending");
    }
}
