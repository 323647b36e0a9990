//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `VELVET_ROPE`
//! prefix and `__` as the nesting separator.
//!
//! # Example
//!
//! ```no_run
//! use velvet_rope::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod game;
mod llm;

pub use error::{ConfigError, ValidationError};
pub use game::GameConfig;
pub use llm::LlmConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Game rules (thresholds, windowing, input limits)
    #[serde(default)]
    pub game: GameConfig,

    /// Text generator settings (endpoint, models, timeouts)
    #[serde(default)]
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads a `.env` file if present, then reads environment variables
    /// with the `VELVET_ROPE` prefix:
    ///
    /// - `VELVET_ROPE__GAME__WIN_THRESHOLD=100` -> `game.win_threshold = 100`
    /// - `VELVET_ROPE__LLM__API_KEY=sk-...` -> `llm.api_key = sk-...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when values cannot be parsed into the
    /// expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VELVET_ROPE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.game.validate()?;
        self.llm.validate()?;
        Ok(())
    }
}
