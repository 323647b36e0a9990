//! Score-driven game state machine and judge score normalization.
//!
//! The cumulative trust score is the single input to state resolution:
//! two configured thresholds split it into won / lost / still talking.
//! Won and lost are terminal - the orchestrator refuses further scored
//! turns once either is reached.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The set of deltas the judge is allowed to hand out.
pub const ALLOWED_DELTAS: [i32; 6] = [-20, -10, 0, 5, 10, 20];

/// Outcome of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    /// The conversation is still going.
    Active,
    /// The player talked their way in.
    Won,
    /// Viktor is done with this player.
    Lost,
}

impl GameState {
    /// Terminal states accept no further scored turns.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameState::Won | GameState::Lost)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameState::Active => "active",
            GameState::Won => "won",
            GameState::Lost => "lost",
        };
        write!(f, "{}", s)
    }
}

/// Resolves cumulative scores into game states and produces the directive
/// string that steers the doorman's next reply.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEngine {
    win_threshold: i32,
    lose_threshold: i32,
}

impl ScoreEngine {
    /// Creates an engine from the two configured thresholds.
    /// `win_threshold` must be strictly greater than `lose_threshold`;
    /// configuration validation enforces this before construction.
    pub fn new(win_threshold: i32, lose_threshold: i32) -> Self {
        debug_assert!(win_threshold > lose_threshold);
        Self {
            win_threshold,
            lose_threshold,
        }
    }

    /// Pure function of the cumulative score and the two thresholds.
    pub fn resolve(&self, score: i32) -> GameState {
        if score >= self.win_threshold {
            GameState::Won
        } else if score <= self.lose_threshold {
            GameState::Lost
        } else {
            GameState::Active
        }
    }

    /// The state-conditioned instruction fed to reply generation.
    /// Empty while the game is active.
    pub fn directive(&self, state: GameState) -> &'static str {
        match state {
            GameState::Won => {
                "IMPORTANT: This person has genuinely convinced you. \
                 On your next response, find a natural reason based on the conversation \
                 to let them in. Open the rope and welcome them warmly but stay in character."
            }
            GameState::Lost => {
                "IMPORTANT: You've had enough of this person. They've either wasted your time, \
                 insulted you, or proven unworthy. Firmly tell them to leave and that they will \
                 not be getting in tonight. End the conversation."
            }
            GameState::Active => "",
        }
    }
}

/// Normalizes a raw judge score into the allowed delta set.
///
/// Clamp to [-20, 20], round to the nearest multiple of 5, then snap to
/// the nearest member of [`ALLOWED_DELTAS`] by absolute distance, breaking
/// ties toward the smaller magnitude (so 15 becomes 10 and -5 becomes 0).
pub fn coerce_delta(raw: i32) -> i32 {
    let clamped = raw.clamp(-20, 20);
    // Round to the nearest multiple of 5. Exact halves cannot occur for
    // integers, so rounding direction never ties.
    let rounded = if clamped >= 0 {
        (clamped + 2) / 5 * 5
    } else {
        (clamped - 2) / 5 * 5
    };
    if ALLOWED_DELTAS.contains(&rounded) {
        return rounded;
    }

    let mut best = ALLOWED_DELTAS[0];
    for candidate in ALLOWED_DELTAS.into_iter().skip(1) {
        let key = ((rounded - candidate).abs(), candidate.abs());
        let best_key = ((rounded - best).abs(), best.abs());
        if key < best_key {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> ScoreEngine {
        ScoreEngine::new(100, -50)
    }

    #[test]
    fn resolve_honors_thresholds() {
        assert_eq!(engine().resolve(100), GameState::Won);
        assert_eq!(engine().resolve(150), GameState::Won);
        assert_eq!(engine().resolve(-50), GameState::Lost);
        assert_eq!(engine().resolve(-80), GameState::Lost);
        assert_eq!(engine().resolve(99), GameState::Active);
        assert_eq!(engine().resolve(-49), GameState::Active);
        assert_eq!(engine().resolve(0), GameState::Active);
    }

    #[test]
    fn won_and_lost_are_terminal() {
        assert!(GameState::Won.is_terminal());
        assert!(GameState::Lost.is_terminal());
        assert!(!GameState::Active.is_terminal());
    }

    #[test]
    fn directive_is_empty_only_while_active() {
        let engine = engine();
        assert!(engine.directive(GameState::Active).is_empty());
        assert!(engine.directive(GameState::Won).contains("let them in"));
        assert!(engine.directive(GameState::Lost).contains("tell them to leave"));
    }

    #[test]
    fn coerce_passes_allowed_values_through() {
        for delta in ALLOWED_DELTAS {
            assert_eq!(coerce_delta(delta), delta);
        }
    }

    #[test]
    fn coerce_clamps_out_of_range_values() {
        assert_eq!(coerce_delta(100), 20);
        assert_eq!(coerce_delta(-100), -20);
        assert_eq!(coerce_delta(21), 20);
        assert_eq!(coerce_delta(-21), -20);
    }

    #[test]
    fn coerce_rounds_to_multiples_of_five() {
        assert_eq!(coerce_delta(12), 10);
        assert_eq!(coerce_delta(13), 10); // 13 -> 15 -> snaps to 10 (smaller magnitude)
        assert_eq!(coerce_delta(18), 20);
        assert_eq!(coerce_delta(-12), -10);
        assert_eq!(coerce_delta(-18), -20);
    }

    #[test]
    fn coerce_breaks_ties_toward_smaller_magnitude() {
        // 15 is equidistant from 10 and 20.
        assert_eq!(coerce_delta(15), 10);
        assert_eq!(coerce_delta(-15), -10);
        // -5 is not in the set; equidistant from -10 and 0.
        assert_eq!(coerce_delta(-5), 0);
        assert_eq!(coerce_delta(-4), 0);
        assert_eq!(coerce_delta(-6), 0);
    }

    #[test]
    fn game_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&GameState::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&GameState::Won).unwrap(), "\"won\"");
        assert_eq!(serde_json::to_string(&GameState::Lost).unwrap(), "\"lost\"");
    }

    proptest! {
        #[test]
        fn coerce_is_idempotent(raw in -1000i32..=1000) {
            let once = coerce_delta(raw);
            prop_assert_eq!(coerce_delta(once), once);
        }

        #[test]
        fn coerce_always_lands_in_allowed_set(raw in -1000i32..=1000) {
            prop_assert!(ALLOWED_DELTAS.contains(&coerce_delta(raw)));
        }

        #[test]
        fn resolve_partitions_scores(score in -1000i32..=1000) {
            let engine = ScoreEngine::new(100, -50);
            let state = engine.resolve(score);
            match state {
                GameState::Won => prop_assert!(score >= 100),
                GameState::Lost => prop_assert!(score <= -50),
                GameState::Active => prop_assert!(score > -50 && score < 100),
            }
        }
    }
}
