//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Win threshold must be strictly greater than lose threshold")]
    InvalidThresholds,

    #[error("Starting score must lie strictly between the thresholds")]
    InvalidStartingScore,

    #[error("Compaction threshold must be greater than the recent window")]
    InvalidCompactionThreshold,

    #[error("Recent window must be at least 1")]
    InvalidRecentWindow,

    #[error("Message limits must be at least 1")]
    InvalidMessageLimits,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid generator base URL")]
    InvalidBaseUrl,
}
