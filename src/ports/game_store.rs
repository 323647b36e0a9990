//! Game store port.
//!
//! Persistence as the engine sees it: session records, an append-only
//! message log returned in insertion order, and a way to commit a session
//! update together with the turn's messages as one unit.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{GameSession, MessageRecord};

/// Store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The session does not exist.
    #[error("session not found")]
    SessionNotFound,

    /// Backend failure (connection, constraint, serialization).
    #[error("store failure: {0}")]
    Backend(String),
}

/// Port for session and message persistence.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Persists a new session.
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError>;

    /// Looks a session up by id. Returns `None` when unknown.
    async fn find_session(&self, id: &Uuid) -> Result<Option<GameSession>, StoreError>;

    /// Replaces the stored session state.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session was never created.
    async fn update_session(&self, session: &GameSession) -> Result<(), StoreError>;

    /// Atomically persists a session update and appends the turn's
    /// messages. Either everything commits or nothing does.
    async fn commit_turn(
        &self,
        session: &GameSession,
        messages: &[MessageRecord],
    ) -> Result<(), StoreError>;

    /// The full ordered message log of a session.
    async fn list_messages(&self, id: &Uuid) -> Result<Vec<MessageRecord>, StoreError>;

    /// Count of user-authored messages (the session's turn count).
    async fn count_user_messages(&self, id: &Uuid) -> Result<u32, StoreError>;

    /// The most recent doorman message, if any.
    async fn last_doorman_message(&self, id: &Uuid) -> Result<Option<MessageRecord>, StoreError>;

    /// All known sessions, oldest first.
    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError>;
}
