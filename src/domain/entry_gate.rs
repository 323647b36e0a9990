//! Post-generation guard against the doorman granting entry out of turn.
//!
//! The game state is authoritative. If a drafted reply contains
//! access-granting language while the state does not license it, the draft
//! is discarded and replaced with a scripted refusal, and the substitution
//! is logged as a policy violation.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::warn;

use super::scoring::GameState;

/// Unconditional grant phrases: any hit rewrites the draft.
static STRONG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\blet(?:ting)? you in\b",
        r"\bopen the rope\b",
        r"\brope is open\b",
        r"\bwelcome (?:inside|in)\b",
        r"\bcome inside\b",
        r"\bgo on in\b",
        r"\bhead inside\b",
        r"\bstep inside\b",
        r"\byou['’]?re in (?:the )?(?:club|golden palm)\b",
        r"\byou are in (?:the )?(?:club|golden palm)\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("entry gate pattern compiles"))
    .collect()
});

/// Short-form phrases: only a grant when the sentence ends there. A
/// continuing word ("you're in luck") or a following "but"/"now" clause is
/// not a grant.
static SHORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bcome in\b",
        r"\byou['’]?re (?:already )?in\b",
        r"\byou are (?:already )?in\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("entry gate pattern compiles"))
    .collect()
});

const EJECTION_REPLY: &str =
    "*Viktor gestures to security.* Enough. Leave. You're not getting in tonight.";
const REFUSAL_REPLY: &str =
    "*Viktor doesn't move.* No. You're not getting in. Talk to me like a human, not a headline.";

/// Scans drafted replies for grant language the state does not license.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryGate;

impl EntryGate {
    /// Returns the draft unchanged when the state is `Won` (or the draft is
    /// empty); otherwise rewrites any draft that grants entry.
    pub fn enforce(state: GameState, draft: &str) -> String {
        if state == GameState::Won || draft.is_empty() {
            return draft.to_string();
        }
        if !Self::grants_entry(draft) {
            return draft.to_string();
        }

        warn!(game_state = %state, "doorman draft granted entry without a won state; rewriting");
        match state {
            GameState::Lost => EJECTION_REPLY.to_string(),
            _ => REFUSAL_REPLY.to_string(),
        }
    }

    /// Whether the draft contains access-granting language.
    pub fn grants_entry(draft: &str) -> bool {
        if STRONG_PATTERNS.iter().any(|p| p.is_match(draft)) {
            return true;
        }
        SHORT_PATTERNS.iter().any(|pattern| {
            pattern
                .find_iter(draft)
                .any(|m| Self::sentence_ends_after(&draft[m.end()..]))
        })
    }

    /// A short-form match counts only when followed by sentence-ending
    /// punctuation or end-of-text. A comma counts unless the next word is
    /// "but" or "now"; anything else is a mid-sentence continuation.
    fn sentence_ends_after(rest: &str) -> bool {
        let rest = rest.trim_start();
        let Some(first) = rest.chars().next() else {
            return true;
        };
        match first {
            '.' | '!' | '?' => true,
            ',' => {
                let after_comma = rest[1..].trim_start().to_lowercase();
                !(after_comma.starts_with("but") || after_comma.starts_with("now"))
            }
            _ => false,
        }
    }
}
