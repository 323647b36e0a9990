//! Game rules configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Tunable game rules: score thresholds, memory cadence, input limits.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Score every session starts at
    #[serde(default = "default_starting_score")]
    pub starting_score: i32,

    /// Cumulative score at or above which the game is won
    #[serde(default = "default_win_threshold")]
    pub win_threshold: i32,

    /// Cumulative score at or below which the game is lost
    #[serde(default = "default_lose_threshold")]
    pub lose_threshold: i32,

    /// Turns between memory compactions
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: u32,

    /// Turns kept verbatim as generation context
    #[serde(default = "default_recent_window")]
    pub recent_window: u32,

    /// Player message length cap, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Player message length cap, in words
    #[serde(default = "default_max_message_words")]
    pub max_message_words: usize,
}

impl GameConfig {
    /// Validate game rule constraints
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.win_threshold <= self.lose_threshold {
            return Err(ValidationError::InvalidThresholds);
        }
        if self.starting_score >= self.win_threshold || self.starting_score <= self.lose_threshold {
            return Err(ValidationError::InvalidStartingScore);
        }
        if self.recent_window == 0 {
            return Err(ValidationError::InvalidRecentWindow);
        }
        // A threshold at or below the window would compact turns that are
        // still inside the verbatim context.
        if self.compaction_threshold <= self.recent_window {
            return Err(ValidationError::InvalidCompactionThreshold);
        }
        if self.max_message_chars == 0 || self.max_message_words == 0 {
            return Err(ValidationError::InvalidMessageLimits);
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_score: default_starting_score(),
            win_threshold: default_win_threshold(),
            lose_threshold: default_lose_threshold(),
            compaction_threshold: default_compaction_threshold(),
            recent_window: default_recent_window(),
            max_message_chars: default_max_message_chars(),
            max_message_words: default_max_message_words(),
        }
    }
}

fn default_starting_score() -> i32 {
    30
}

fn default_win_threshold() -> i32 {
    100
}

fn default_lose_threshold() -> i32 {
    -50
}

fn default_compaction_threshold() -> u32 {
    10
}

fn default_recent_window() -> u32 {
    8
}

fn default_max_message_chars() -> usize {
    750
}

fn default_max_message_words() -> usize {
    150
}
