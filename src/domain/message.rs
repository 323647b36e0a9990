//! Messages in the session log.
//!
//! Append order is the sole ordering key; the store returns the log in
//! insertion order and turn numbers are derived by counting user-authored
//! records, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The player at the rope.
    User,
    /// Viktor.
    Doorman,
}

/// One entry in a session's ordered message log. Score annotations exist
/// only on user messages that went through the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: MessageRole,
    pub content: String,
    pub score_delta: Option<i32>,
    pub judge_reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            score_delta: None,
            judge_reasoning: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a doorman reply.
    pub fn doorman(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Doorman,
            content: content.into(),
            score_delta: None,
            judge_reasoning: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches the judge's verdict to a user message.
    pub fn with_judgement(mut self, delta: i32, reasoning: impl Into<String>) -> Self {
        self.score_delta = Some(delta);
        self.judge_reasoning = Some(reasoning.into());
        self
    }

    /// Whether this record advances the turn counter.
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_records_advance_turns() {
        assert!(MessageRecord::user("hello").is_user());
        assert!(!MessageRecord::doorman("Not on the list.").is_user());
    }

    #[test]
    fn judgement_lands_on_the_record() {
        let record = MessageRecord::user("let me in").with_judgement(-10, "entitled opener");
        assert_eq!(record.score_delta, Some(-10));
        assert_eq!(record.judge_reasoning.as_deref(), Some("entitled opener"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Doorman).unwrap(),
            "\"doorman\""
        );
    }
}
