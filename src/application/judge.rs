//! The hidden judge: scores each player message against the allowed deltas.

use serde::Deserialize;
use tracing::warn;

use super::prompts::build_judge_prompt;
use super::structured::StructuredOutputClient;
use crate::domain::{coerce_delta, MessageRecord, MessageRole, ALLOWED_DELTAS};
use crate::ports::{ChatRequest, ChatRole, GeneratorError};

const JUDGE_RETRY_HINT: &str = concat!(
    "Return ONLY valid JSON matching this schema:\n",
    r#"{"reasoning":"...","score":0}"#,
    "\nRules: allowed scores are -20, -10, 0, 5, 10, 20. No extra text."
);

/// The judge's scoring of a single player message. The delta is already
/// coerced into the allowed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub delta: i32,
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    score: i32,
    #[serde(default)]
    reasoning: String,
}

/// Scores player messages. Never talks to the player.
pub struct Judge {
    client: StructuredOutputClient,
    model: String,
}

impl Judge {
    pub fn new(client: StructuredOutputClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Scores the latest player message against the recent transcript and
    /// the session memory. Out-of-set scores are coerced, not rejected;
    /// a missing or non-integer score is a failure the caller absorbs.
    pub async fn evaluate(
        &self,
        session_memory: &str,
        recent: &[MessageRecord],
        user_message: &str,
    ) -> Result<JudgeVerdict, GeneratorError> {
        let request = ChatRequest::new(&self.model)
            .with_message(ChatRole::System, build_judge_prompt(session_memory))
            .with_message(
                ChatRole::User,
                format!(
                    "RECENT CONVERSATION TRANSCRIPT:\n{}\n\nLATEST USER MESSAGE:\n{}",
                    format_transcript(recent),
                    user_message
                ),
            )
            .with_temperature(0.0)
            .with_max_tokens(250);

        let raw: RawVerdict = self.client.complete_typed(request, JUDGE_RETRY_HINT).await?;

        let delta = coerce_delta(raw.score);
        if !ALLOWED_DELTAS.contains(&raw.score) {
            warn!(raw = raw.score, coerced = delta, "judge score coerced");
        }
        Ok(JudgeVerdict {
            delta,
            reasoning: raw.reasoning,
        })
    }
}

fn format_transcript(recent: &[MessageRecord]) -> String {
    if recent.is_empty() {
        return "(none)".to_string();
    }
    let lines: Vec<String> = recent
        .iter()
        .map(|record| {
            let speaker = match record.role {
                MessageRole::User => "User",
                MessageRole::Doorman => "Viktor",
            };
            format!("{}: {}", speaker, record.content)
        })
        .collect();
    lines.join("\n")
}
