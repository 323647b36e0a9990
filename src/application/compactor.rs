//! Periodic memory compaction.
//!
//! Turns that have scrolled out of the recent window are folded into the
//! structured session memory. Compaction is best-effort: any failure is
//! logged and skipped, and the same range is simply retried on a later
//! turn because the cursor only advances on success.

use tracing::{debug, warn};

use super::prompts::build_compactor_prompt;
use super::structured::StructuredOutputClient;
use crate::domain::{compaction_slice, GameSession, MessageRecord, MessageRole, SessionMemory};
use crate::ports::{ChatRequest, ChatRole};

/// Folds old turns into the session memory blob.
pub struct MemoryCompactor {
    client: StructuredOutputClient,
    model: String,
    compaction_threshold: u32,
    recent_window: u32,
}

impl MemoryCompactor {
    pub fn new(
        client: StructuredOutputClient,
        model: impl Into<String>,
        compaction_threshold: u32,
        recent_window: u32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            compaction_threshold,
            recent_window,
        }
    }

    /// Compacts when due, mutating the session's memory blob and cursor.
    /// Returns whether a compaction happened. Generator and shape failures
    /// are absorbed: the session is left untouched and the turn goes on.
    pub async fn maybe_compact(
        &self,
        session: &mut GameSession,
        log: &[MessageRecord],
        current_turn: u32,
    ) -> bool {
        if current_turn < session.last_compacted_turn + self.compaction_threshold {
            return false;
        }
        let cutoff = current_turn.saturating_sub(self.recent_window);
        if cutoff <= session.last_compacted_turn {
            return false;
        }

        let slice = compaction_slice(log, session.last_compacted_turn + 1, cutoff);
        if slice.is_empty() {
            return false;
        }

        let existing = session.memory_blob_or_empty();
        let prompt = build_compactor_prompt(&existing, &format_for_compaction(&slice));
        let request = ChatRequest::new(&self.model)
            .with_message(ChatRole::System, prompt)
            .with_message(ChatRole::User, "Update session memory.")
            .with_temperature(0.0)
            .with_max_tokens(1600);

        let memory: SessionMemory = match self
            .client
            .complete_typed(request, "Return ONLY valid JSON.")
            .await
        {
            Ok(memory) => memory,
            Err(err) => {
                warn!(error = %err, "compaction skipped");
                return false;
            }
        };

        session.memory_blob = Some(memory.to_blob());
        session.last_compacted_turn = cutoff;
        debug!(
            up_to_turn = cutoff,
            claims = memory.claims.len(),
            "session memory compacted"
        );
        true
    }
}

fn format_for_compaction(slice: &[(u32, MessageRecord)]) -> String {
    let lines: Vec<String> = slice
        .iter()
        .map(|(turn, record)| {
            let speaker = match record.role {
                MessageRole::User => "User",
                MessageRole::Doorman => "Viktor",
            };
            format!("Turn {} - {}: {}", turn, speaker, record.content)
        })
        .collect();
    lines.join("\n")
}
