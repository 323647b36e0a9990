//! Turn derivation and conversation windowing.
//!
//! Turn numbers are derived by walking the ordered log and counting
//! user-authored records. The recent window keeps every record whose turn
//! number is past the cutoff, which keeps user/doorman pairs intact across
//! the boundary: a doorman reply survives exactly when the user message it
//! answers does.

use super::message::MessageRecord;

/// Number of completed turns in the log: one per user-authored record.
pub fn turn_count(log: &[MessageRecord]) -> u32 {
    log.iter().filter(|m| m.is_user()).count() as u32
}

/// The bounded "recent" subsequence used as generation context.
///
/// Cutoff turn is `current_turn - window` (floored at 0); every record
/// with a derived turn number strictly greater than the cutoff is kept.
pub fn recent_window(log: &[MessageRecord], current_turn: u32, window: u32) -> Vec<MessageRecord> {
    let cutoff = current_turn.saturating_sub(window);
    let mut turn = 0u32;
    let mut recent = Vec::new();
    for record in log {
        if record.is_user() {
            turn += 1;
        }
        if turn > cutoff {
            recent.push(record.clone());
        }
    }
    recent
}

/// Records whose turn numbers fall in `start_turn..=end_turn`, paired with
/// their turn numbers, in log order. Used to select the compaction range.
pub fn compaction_slice(
    log: &[MessageRecord],
    start_turn: u32,
    end_turn: u32,
) -> Vec<(u32, MessageRecord)> {
    let mut turn = 0u32;
    let mut selected = Vec::new();
    for record in log {
        if record.is_user() {
            turn += 1;
        }
        if turn >= start_turn && turn <= end_turn {
            selected.push((turn, record.clone()));
        }
    }
    selected
}
