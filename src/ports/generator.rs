//! Text generator port.
//!
//! The engine treats generation as an opaque, fallible function from an
//! ordered message list to text. Each turn issues at most three blocking
//! round-trips (judge, compactor, doorman); there is no streaming and no
//! mid-flight cancellation - a timed-out call is a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a chat message sent to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that guide model behavior.
    System,
    /// Player input.
    User,
    /// Prior generator output.
    Assistant,
}

/// A message in the generation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// Creates a new message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier, chosen per agent by configuration.
    pub model: String,
    /// Ordered context, system messages included.
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request for the given model with default sampling.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Appends a message.
    pub fn with_message(mut self, role: ChatRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(role, content));
        self
    }

    /// Appends a batch of messages.
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the completion token cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generator failures. The turn pipeline does not distinguish causes
/// beyond logging; every variant maps to the same caller-facing error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// Network or protocol failure reaching the service.
    #[error("generation request failed: {0}")]
    Transport(String),

    /// The caller-supplied timeout elapsed.
    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },

    /// API key rejected.
    #[error("generator authentication failed")]
    AuthenticationFailed,

    /// The service reported itself unavailable.
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    /// Output stayed unusable after the repair/retry budget.
    #[error("generator returned unusable output: {0}")]
    MalformedOutput(String),
}

/// Port for the external text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// One blocking round-trip: ordered messages in, text out.
    async fn complete(&self, request: ChatRequest) -> Result<String, GeneratorError>;
}
