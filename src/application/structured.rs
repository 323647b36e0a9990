//! Structured-output protocol on top of the raw generator.
//!
//! One retry budget covers both transport failures and unparseable output.
//! A failed extraction re-issues the request with the caller's schema hint
//! appended and sampling pinned to zero; the original request is never
//! mutated, each retry rebuilds the context from it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{diagnostic_snippet, ExtractionError, JsonExtractor};
use crate::ports::{ChatMessage, ChatRequest, GeneratorError, TextGenerator};

/// Wraps a [`TextGenerator`] with JSON extraction, repair, and retries.
#[derive(Clone)]
pub struct StructuredOutputClient {
    generator: Arc<dyn TextGenerator>,
    extractor: JsonExtractor,
    retry_budget: u32,
}

impl StructuredOutputClient {
    /// Client with repair enabled and the given extra-attempt budget.
    pub fn new(generator: Arc<dyn TextGenerator>, retry_budget: u32) -> Self {
        Self {
            generator,
            extractor: JsonExtractor::new(),
            retry_budget,
        }
    }

    /// Runs the request until a JSON object comes back or the budget is
    /// spent. `retry_hint` restates the expected schema for the model on
    /// the retry attempts.
    pub async fn complete_json(
        &self,
        request: ChatRequest,
        retry_hint: &str,
    ) -> Result<Map<String, Value>, GeneratorError> {
        let mut last_output = String::new();

        for attempt in 0..=self.retry_budget {
            let current = if attempt == 0 {
                request.clone()
            } else {
                request
                    .clone()
                    .with_messages([
                        ChatMessage::system(retry_hint),
                        ChatMessage::system("Return a single JSON object and nothing else."),
                    ])
                    .with_temperature(0.0)
            };

            let output = match self.generator.complete(current).await {
                Ok(output) => output,
                Err(err) => {
                    if attempt >= self.retry_budget {
                        return Err(err);
                    }
                    warn!(attempt, error = %err, "generation failed, retrying");
                    continue;
                }
            };

            match self.extractor.extract(&output) {
                Ok(object) => return Ok(object),
                Err(err) => {
                    warn!(
                        attempt,
                        error = %err,
                        "generator output was not a JSON object"
                    );
                    last_output = output;
                }
            }
        }

        Err(GeneratorError::MalformedOutput(diagnostic_snippet(
            &last_output,
        )))
    }

    /// Like [`complete_json`](Self::complete_json), but deserializes the
    /// object into the expected shape. A well-formed object with the wrong
    /// shape is a schema failure, reported distinctly from parse failure.
    pub async fn complete_typed<T: DeserializeOwned>(
        &self,
        request: ChatRequest,
        retry_hint: &str,
    ) -> Result<T, GeneratorError> {
        let object = self.complete_json(request, retry_hint).await?;
        serde_json::from_value(Value::Object(object)).map_err(|err| {
            GeneratorError::MalformedOutput(
                ExtractionError::SchemaValidation(err.to_string()).to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockGenerator;
    use crate::ports::ChatRole;

    fn request() -> ChatRequest {
        ChatRequest::new("judge-model").with_message(ChatRole::System, "score the message")
    }

    #[tokio::test]
    async fn first_attempt_success_makes_one_call() {
        let generator = Arc::new(MockGenerator::new().with_reply(r#"{"score": 5}"#));
        let client = StructuredOutputClient::new(generator.clone(), 1);

        let object = client.complete_json(request(), "hint").await.unwrap();
        assert_eq!(object["score"], serde_json::json!(5));
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn retry_appends_hint_and_pins_temperature() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply("I refuse to answer in JSON.")
                .with_reply(r#"{"score": 0}"#),
        );
        let client = StructuredOutputClient::new(generator.clone(), 1);

        let object = client
            .complete_json(request(), "Return ONLY valid JSON.")
            .await
            .unwrap();
        assert_eq!(object["score"], serde_json::json!(0));

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].temperature, 0.0);
        let appended: Vec<&str> = calls[1]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(appended.contains(&"Return ONLY valid JSON."));
        assert!(appended.contains(&"Return a single JSON object and nothing else."));
        // The hint is appended to the original context, not accumulated.
        assert_eq!(calls[1].messages.len(), calls[0].messages.len() + 2);
    }

    #[tokio::test]
    async fn exhausted_budget_reports_malformed_output() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_reply("still not json")
                .with_reply("and again, no json here"),
        );
        let client = StructuredOutputClient::new(generator.clone(), 1);

        let err = client.complete_json(request(), "hint").await.unwrap_err();
        match err {
            GeneratorError::MalformedOutput(snippet) => {
                assert!(snippet.contains("no json here"));
            }
            other => panic!("expected MalformedOutput, got {:?}", other),
        }
        assert_eq!(generator.calls().len(), 2);
    }

    #[tokio::test]
    async fn transport_failures_consume_the_same_budget() {
        let generator = Arc::new(
            MockGenerator::new()
                .with_error(GeneratorError::Transport("connection reset".into()))
                .with_reply(r#"{"score": 10}"#),
        );
        let client = StructuredOutputClient::new(generator.clone(), 1);

        let object = client.complete_json(request(), "hint").await.unwrap();
        assert_eq!(object["score"], serde_json::json!(10));
    }

    #[tokio::test]
    async fn final_transport_failure_propagates_as_is() {
        let generator = Arc::new(
            MockGenerator::new().with_error(GeneratorError::Timeout { timeout_secs: 45 }),
        );
        let client = StructuredOutputClient::new(generator, 0);

        let err = client.complete_json(request(), "hint").await.unwrap_err();
        assert_eq!(err, GeneratorError::Timeout { timeout_secs: 45 });
    }

    #[tokio::test]
    async fn typed_completion_reports_schema_failures_distinctly() {
        #[derive(Debug, serde::Deserialize)]
        struct Verdict {
            #[allow(dead_code)]
            score: i32,
        }

        let generator = Arc::new(MockGenerator::new().with_reply(r#"{"score": "not a number"}"#));
        let client = StructuredOutputClient::new(generator, 0);
        let err = client
            .complete_typed::<Verdict>(request(), "hint")
            .await
            .unwrap_err();
        match err {
            GeneratorError::MalformedOutput(message) => {
                assert!(message.contains("schema validation failed"));
            }
            other => panic!("expected MalformedOutput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn repair_handles_fenced_output_without_a_retry() {
        let generator =
            Arc::new(MockGenerator::new().with_reply("```json\n{\"score\": 20}\n```"));
        let client = StructuredOutputClient::new(generator.clone(), 1);

        let object = client.complete_json(request(), "hint").await.unwrap();
        assert_eq!(object["score"], serde_json::json!(20));
        assert_eq!(generator.calls().len(), 1);
    }
}
