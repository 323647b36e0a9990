//! Mock generator for testing.
//!
//! Queued replies are consumed in order; once the queue is empty the
//! default reply is returned. Every request is recorded for verification.
//!
//! # Example
//!
//! ```ignore
//! let generator = MockGenerator::new()
//!     .with_reply(r#"{"reasoning": "fair", "score": 5}"#)
//!     .with_reply("*Viktor nods.* Go on.");
//!
//! let reply = generator.complete(request).await?;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{ChatRequest, GeneratorError, TextGenerator};

type QueuedReply = Result<String, GeneratorError>;

/// Scriptable [`TextGenerator`] double.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    replies: Arc<Mutex<VecDeque<QueuedReply>>>,
    calls: Arc<Mutex<Vec<ChatRequest>>>,
    default_reply: String,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    /// Creates a mock that answers "ok" once its queue runs dry.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            default_reply: "ok".to_string(),
        }
    }

    /// Queues a successful reply.
    pub fn with_reply(self, content: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .push_back(Ok(content.into()));
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: GeneratorError) -> Self {
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .push_back(Err(error));
        self
    }

    /// Sets the reply used when the queue is empty.
    pub fn with_default_reply(mut self, content: impl Into<String>) -> Self {
        self.default_reply = content.into();
        self
    }

    /// All requests seen so far, in order.
    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, request: ChatRequest) -> Result<String, GeneratorError> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(request);
        self.replies
            .lock()
            .expect("mock reply queue poisoned")
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_reply.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChatRole;

    #[tokio::test]
    async fn replies_are_consumed_in_order_then_default() {
        let generator = MockGenerator::new()
            .with_reply("first")
            .with_error(GeneratorError::AuthenticationFailed)
            .with_default_reply("fallback");

        let request = ChatRequest::new("m").with_message(ChatRole::User, "hi");
        assert_eq!(generator.complete(request.clone()).await.unwrap(), "first");
        assert_eq!(
            generator.complete(request.clone()).await.unwrap_err(),
            GeneratorError::AuthenticationFailed
        );
        assert_eq!(generator.complete(request).await.unwrap(), "fallback");
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn calls_record_the_full_request() {
        let generator = MockGenerator::new();
        let request = ChatRequest::new("judge-model")
            .with_message(ChatRole::System, "score it")
            .with_temperature(0.0);
        generator.complete(request.clone()).await.unwrap();
        assert_eq!(generator.calls()[0], request);
    }
}
