//! Domain layer: pure game logic with no I/O.
//!
//! Everything in this module is synchronous and deterministic - scoring,
//! the game state machine, safety rules, the entry gate, conversation
//! windowing, the session memory model, and JSON extraction from untrusted
//! generator output.

mod entry_gate;
mod errors;
mod extractor;
mod memory;
mod message;
mod safety;
mod scoring;
mod session;
mod window;

pub use entry_gate::EntryGate;
pub use errors::{DomainError, ErrorCode};
pub use extractor::{diagnostic_snippet, ExtractionError, JsonExtractor, DIAGNOSTIC_SNIPPET_CHARS};
pub use memory::{Claim, Contradiction, SessionMemory};
pub use message::{MessageRecord, MessageRole};
pub use safety::{SafetyCategory, SafetyScreen};
pub use scoring::{coerce_delta, GameState, ScoreEngine, ALLOWED_DELTAS};
pub use session::GameSession;
pub use window::{compaction_slice, recent_window, turn_count};
