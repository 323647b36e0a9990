//! Text generator configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Configuration for the OpenAI-compatible chat completion service.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// API key, kept out of Debug output
    pub api_key: Option<Secret<String>>,

    /// Base URL of the chat completion endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for Viktor's replies
    #[serde(default = "default_doorman_model")]
    pub doorman_model: String,

    /// Model used for scoring
    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    /// Model used for memory compaction; falls back to the doorman model
    pub compactor_model: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,

    /// Extra attempts allowed when structured output comes back unusable
    #[serde(default = "default_json_retries")]
    pub json_retries: u32,
}

impl LlmConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_secs))
    }

    /// Whether an API key is present and non-empty
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    /// Compaction model, defaulting to the doorman model
    pub fn compactor_model(&self) -> &str {
        self.compactor_model.as_deref().unwrap_or(&self.doorman_model)
    }

    /// Validate generator configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("LLM API key"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            doorman_model: default_doorman_model(),
            judge_model: default_judge_model(),
            compactor_model: None,
            timeout_secs: default_timeout(),
            json_retries: default_json_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_doorman_model() -> String {
    "gpt-4o".to_string()
}

fn default_judge_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u32 {
    45
}

fn default_json_retries() -> u32 {
    1
}
