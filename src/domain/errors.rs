//! Error types for the game engine.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Machine-readable error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Input failed shape or length validation.
    ValidationFailed,
    /// The referenced session does not exist.
    SessionNotFound,
    /// A turn was submitted against a session that already ended.
    GameOver,
    /// The text generator failed (transport or unusable output) after
    /// the repair/retry budget was exhausted.
    GeneratorFailed,
    /// The backing store failed.
    StoreFailed,
    /// Unexpected internal failure.
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::GameOver => "GAME_OVER",
            ErrorCode::GeneratorFailed => "GENERATOR_FAILED",
            ErrorCode::StoreFailed => "STORE_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard engine error with code, human-readable message, and optional
/// key/value details. Details never contain prompt content or generator
/// output beyond the bounded diagnostic snippet.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field)
    }

    /// Creates a session-not-found error.
    pub fn session_not_found(session_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::SessionNotFound, "Session not found.")
            .with_detail("session_id", session_id.to_string())
    }

    /// Creates a conflict error for a terminal session.
    pub fn game_over(state: impl fmt::Display) -> Self {
        Self::new(ErrorCode::GameOver, "Game already ended.")
            .with_detail("game_state", state.to_string())
    }

    /// Creates a generator failure error.
    pub fn generator(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::GeneratorFailed, message)
    }

    /// Creates a store failure error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreFailed, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}
