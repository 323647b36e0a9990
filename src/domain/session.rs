//! The game session aggregate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::memory::SessionMemory;
use super::scoring::GameState;

/// Per-session state: cumulative score, resolved game state, the opaque
/// compacted memory blob, and the compaction cursor.
///
/// Score and state change exactly once per accepted turn, committed
/// atomically with the turn's messages. The memory blob and cursor change
/// at most once per turn and only on successful compaction.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub id: Uuid,
    pub score: i32,
    pub state: GameState,
    /// Serialized [`SessionMemory`]; `None` until the first compaction.
    pub memory_blob: Option<String>,
    /// Last turn number already folded into the memory blob.
    pub last_compacted_turn: u32,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Creates a fresh session at the configured starting score.
    pub fn new(starting_score: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            score: starting_score,
            state: GameState::Active,
            memory_blob: None,
            last_compacted_turn: 0,
            created_at: Utc::now(),
        }
    }

    /// The memory blob, or the all-empty structure when nothing has been
    /// compacted yet.
    pub fn memory_blob_or_empty(&self) -> String {
        self.memory_blob
            .clone()
            .unwrap_or_else(SessionMemory::empty_blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_active_at_configured_score() {
        let session = GameSession::new(30);
        assert_eq!(session.score, 30);
        assert_eq!(session.state, GameState::Active);
        assert_eq!(session.last_compacted_turn, 0);
        assert!(session.memory_blob.is_none());
    }

    #[test]
    fn absent_memory_reads_as_empty_structure() {
        let session = GameSession::new(30);
        let memory = SessionMemory::from_blob(&session.memory_blob_or_empty()).unwrap();
        assert_eq!(memory, SessionMemory::default());
    }
}
