//! Generation oracle: a single-completion text-generation interface.
//!
//! The engine always requests exactly one schema-bound completion per logical
//! step (narrative composition, or preference reflection). No conversation
//! state lives on the oracle side — any history a caller wants is flattened
//! into the prompt before the call.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// One-shot completion interface for text generation.
///
/// Implementations must be stateless across calls; the prompt carries
/// everything the oracle needs.
pub trait GenerationOracle: Send + Sync {
    /// Generate a single completion for the prompt.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Configuration for the Ollama-backed generation oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds. Generation latency dominates the whole
    /// pipeline, so this is the largest timeout in the system.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

/// Client for the Ollama `/api/generate` endpoint.
pub struct OllamaClient {
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    /// Probe the server with a lightweight request to `/api/tags`.
    ///
    /// Useful as a startup health check; `complete` does not require it.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();
        matches!(agent.get(&url).call(), Ok(resp) if resp.status() == 200)
    }

    /// Get the model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn map_call_error(&self, err: ureq::Error) -> LlmError {
        match err {
            ureq::Error::Transport(t) => {
                let message = t.to_string();
                if matches!(t.kind(), ureq::ErrorKind::Io) && message.contains("timed out") {
                    LlmError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else if matches!(t.kind(), ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns)
                {
                    LlmError::Unavailable {
                        url: self.config.base_url.clone(),
                    }
                } else {
                    LlmError::RequestFailed { message }
                }
            }
            other => LlmError::RequestFailed {
                message: other.to_string(),
            },
        }
    }
}

impl GenerationOracle for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "generation request");

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e| self.map_call_error(e))?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "missing 'response' field".into(),
            })
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_unreachable_returns_false() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".into(), // unreachable port
            ..Default::default()
        };
        let client = OllamaClient::new(config);
        assert!(!client.probe());
    }

    #[test]
    fn complete_against_unreachable_server_errors() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let client = OllamaClient::new(config);
        let result = client.complete("hello");
        assert!(result.is_err());
    }

    #[test]
    fn default_config_values() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.timeout_secs, 120);
    }
}
