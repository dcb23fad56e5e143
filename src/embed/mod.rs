//! Embedding oracle: text to fixed-length vector.
//!
//! The query embedding is the anchor of the whole retrieval step, so this
//! collaborator fails loudly: an unreachable server or an empty vector is an
//! error, never a silent zero vector that would quietly degrade search.

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Maps text to a fixed-length numeric vector.
///
/// Implementations should be deterministic enough that the same text yields
/// the same vector within floating-point tolerance.
pub trait EmbeddingOracle: Send + Sync {
    /// Embed a single text. The returned vector is never empty.
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Configuration for the Ollama-backed embedding oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Request timeout in seconds. Embedding is fast relative to generation,
    /// so a hung call should fail well before the generation budget.
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            timeout_secs: 20,
        }
    }
}

/// Client for the Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    config: EmbedderConfig,
}

impl OllamaEmbedder {
    /// Create a new embedder with the given configuration.
    pub fn new(config: EmbedderConfig) -> Self {
        Self { config }
    }

    /// Get the embedding model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn map_call_error(&self, err: ureq::Error) -> RetrievalError {
        match err {
            ureq::Error::Transport(t) => {
                let message = t.to_string();
                if matches!(t.kind(), ureq::ErrorKind::Io) && message.contains("timed out") {
                    RetrievalError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else if matches!(t.kind(), ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns)
                {
                    RetrievalError::Unavailable {
                        url: self.config.base_url.clone(),
                    }
                } else {
                    RetrievalError::RequestFailed { message }
                }
            }
            other => RetrievalError::RequestFailed {
                message: other.to_string(),
            },
        }
    }
}

impl EmbeddingOracle for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": text,
        });

        let body_str = serde_json::to_string(&body).map_err(|e| RetrievalError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        tracing::debug!(model = %self.config.model, text_len = text.len(), "embedding request");

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e| self.map_call_error(e))?;

        let resp_str = resp.into_string().map_err(|e| RetrievalError::BadResponse {
            message: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| RetrievalError::BadResponse {
                message: e.to_string(),
            })?;

        let vector: Vec<f32> = json["embedding"]
            .as_array()
            .ok_or_else(|| RetrievalError::BadResponse {
                message: "missing 'embedding' field".into(),
            })?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.is_empty() {
            return Err(RetrievalError::BadResponse {
                message: "embedding vector is empty".into(),
            });
        }

        Ok(vector)
    }
}

impl std::fmt::Debug for OllamaEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEmbedder")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}
