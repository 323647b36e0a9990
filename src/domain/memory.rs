//! Structured session memory produced by compaction.
//!
//! The memory is append-only by contract: each compaction must carry every
//! prior claim and contradiction forward. Between calls it travels as an
//! opaque serialized blob on the session and is replaced wholesale, never
//! merged field by field.

use serde::{Deserialize, Serialize};

/// A fact the player stated, tagged with the turn it was made on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim: String,
    /// Conversation turn (one user message plus Viktor's reply).
    pub turn: u32,
}

/// Two claims that cannot both be true, with the turns they were made on.
/// Both sides stay recorded; compaction never discards either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub original_claim: String,
    pub contradicting_claim: String,
    pub turns: Vec<u32>,
}

/// Bounded long-range memory of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    /// 1-2 sentence rapport summary of where things stand.
    #[serde(default)]
    pub conversation_state: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
    /// Unanswered questions and dangling topics.
    #[serde(default)]
    pub open_threads: Vec<String>,
}

impl SessionMemory {
    /// The serialized form of an absent memory: all collections empty.
    pub fn empty_blob() -> String {
        SessionMemory::default().to_blob()
    }

    /// Serializes the memory for storage on the session.
    pub fn to_blob(&self) -> String {
        serde_json::to_string(self).expect("session memory serializes to JSON")
    }

    /// Deserializes a stored blob. A blob the engine wrote always parses;
    /// this exists for tests and for validating compactor output.
    pub fn from_blob(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }

    /// Whether an identical claim text is already recorded.
    pub fn has_claim(&self, text: &str) -> bool {
        self.claims.iter().any(|c| c.claim == text)
    }
}
