//! OpenAI-compatible chat completion adapter.
//!
//! Talks to any service exposing the `/chat/completions` shape. The model
//! travels on each request, so one adapter instance serves all three
//! agents.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAiConfig::new(api_key)
//!     .with_base_url("https://api.openai.com/v1")
//!     .with_timeout(Duration::from_secs(45));
//!
//! let generator = OpenAiGenerator::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{ChatMessage, ChatRequest, GeneratorError, TextGenerator};

/// Configuration for the OpenAI-compatible adapter.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(45),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Chat completion client over HTTP.
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiGenerator {
    /// Creates a new generator with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::Transport` when the HTTP client cannot be
    /// constructed.
    pub fn new(config: OpenAiConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::Transport(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_wire_request(request: &ChatRequest) -> WireRequest {
        WireRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, GeneratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => Err(GeneratorError::AuthenticationFailed),
            500..=599 => Err(GeneratorError::Unavailable(format!(
                "server error {}: {}",
                status, error_body
            ))),
            _ => Err(GeneratorError::Transport(format!(
                "unexpected status {}: {}",
                status, error_body
            ))),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, request: ChatRequest) -> Result<String, GeneratorError> {
        let wire_request = Self::to_wire_request(&request);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    GeneratorError::Transport(format!("connection failed: {}", e))
                } else {
                    GeneratorError::Transport(e.to_string())
                }
            })?;

        let response = self.handle_response_status(response).await?;
        let wire_response: WireResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::MalformedOutput(format!("response body: {}", e)))?;

        let choice = wire_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::MalformedOutput("no choices in response".into()))?;
        Ok(choice.message.content)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChatRole;
    use serde_json::json;

    #[test]
    fn wire_request_serializes_the_expected_shape() {
        let request = ChatRequest::new("gpt-4o")
            .with_message(ChatRole::System, "be terse")
            .with_message(ChatRole::User, "hello")
            .with_temperature(0.0);
        let wire = OpenAiGenerator::to_wire_request(&request);
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["model"], json!("gpt-4o"));
        assert_eq!(value["messages"][0]["role"], json!("system"));
        assert_eq!(value["messages"][1]["content"], json!("hello"));
        assert_eq!(value["temperature"], json!(0.0));
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn max_tokens_is_serialized_when_set() {
        let request = ChatRequest::new("gpt-4o-mini").with_max_tokens(250);
        let value = serde_json::to_value(OpenAiGenerator::to_wire_request(&request)).unwrap();
        assert_eq!(value["max_tokens"], json!(250));
    }

    #[test]
    fn wire_response_parses_first_choice_content() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Not on the list."}}
            ]
        });
        let parsed: WireResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Not on the list.");
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        let body = json!({"choices": [{"message": {"role": "assistant"}}]});
        let parsed: WireResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.choices[0].message.content.is_empty());
    }

    #[test]
    fn config_debug_hides_the_key() {
        let config = OpenAiConfig::new("sk-secret-key");
        assert!(!format!("{:?}", config).contains("sk-secret-key"));
    }
}
