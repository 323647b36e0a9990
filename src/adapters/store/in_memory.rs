//! In-memory game store.
//!
//! Backs development and tests. One `RwLock` over both maps makes
//! `commit_turn` trivially atomic: the session update and the message
//! appends happen under a single write guard.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{GameSession, MessageRecord, MessageRole};
use crate::ports::{GameStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<Uuid, GameSession>,
    messages: HashMap<Uuid, Vec<MessageRecord>>,
}

/// [`GameStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn create_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::Backend(format!(
                "session {} already exists",
                session.id
            )));
        }
        inner.sessions.insert(session.id, session.clone());
        inner.messages.insert(session.id, Vec::new());
        Ok(())
    }

    async fn find_session(&self, id: &Uuid) -> Result<Option<GameSession>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(id).cloned())
    }

    async fn update_session(&self, session: &GameSession) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(StoreError::SessionNotFound),
        }
    }

    async fn commit_turn(
        &self,
        session: &GameSession,
        messages: &[MessageRecord],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&session.id) {
            return Err(StoreError::SessionNotFound);
        }
        inner.sessions.insert(session.id, session.clone());
        inner
            .messages
            .entry(session.id)
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn list_messages(&self, id: &Uuid) -> Result<Vec<MessageRecord>, StoreError> {
        let inner = self.inner.read().await;
        match inner.messages.get(id) {
            Some(log) => Ok(log.clone()),
            None => Err(StoreError::SessionNotFound),
        }
    }

    async fn count_user_messages(&self, id: &Uuid) -> Result<u32, StoreError> {
        let inner = self.inner.read().await;
        match inner.messages.get(id) {
            Some(log) => Ok(log.iter().filter(|m| m.is_user()).count() as u32),
            None => Err(StoreError::SessionNotFound),
        }
    }

    async fn last_doorman_message(&self, id: &Uuid) -> Result<Option<MessageRecord>, StoreError> {
        let inner = self.inner.read().await;
        match inner.messages.get(id) {
            Some(log) => Ok(log
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Doorman)
                .cloned()),
            None => Err(StoreError::SessionNotFound),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<GameSession>, StoreError> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<GameSession> = inner.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}
