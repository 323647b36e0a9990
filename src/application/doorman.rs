//! Viktor's reply generation.

use super::prompts::build_doorman_prompt;
use crate::domain::{MessageRecord, MessageRole};
use crate::ports::{ChatMessage, ChatRequest, ChatRole, GeneratorError, TextGenerator};
use std::sync::Arc;

/// Generates Viktor's in-character replies. The state directive comes from
/// the score engine and is the only channel through which the outcome of
/// the turn reaches the reply.
pub struct Doorman {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl Doorman {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    /// One reply to the player's latest message, conditioned on the recent
    /// window, the session memory, and the state directive.
    pub async fn respond(
        &self,
        session_memory: &str,
        recent: &[MessageRecord],
        user_message: &str,
        directive: &str,
    ) -> Result<String, GeneratorError> {
        let mut messages = vec![ChatMessage::system(build_doorman_prompt(directive))];
        if !session_memory.is_empty() {
            messages.push(ChatMessage::system(format!(
                "SESSION MEMORY:\n{}",
                session_memory
            )));
        }
        for record in recent {
            let role = match record.role {
                MessageRole::User => ChatRole::User,
                MessageRole::Doorman => ChatRole::Assistant,
            };
            messages.push(ChatMessage::new(role, record.content.clone()));
        }
        messages.push(ChatMessage::user(user_message));

        let request = ChatRequest::new(&self.model)
            .with_messages(messages)
            .with_temperature(0.7);
        self.generator.complete(request).await
    }
}
