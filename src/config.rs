//! Planner configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embed::EmbedderConfig;
use crate::error::ConfigError;
use crate::llm::OllamaConfig;
use crate::route::{RouteConfig, TravelMode};

/// Configuration for [`JourneyPlanner`](crate::planner::JourneyPlanner).
///
/// Every external call carries its own timeout, configured on the relevant
/// collaborator section; generation latency dominates, so its budget is the
/// largest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Number of context chunks retrieved per narrative.
    pub top_k: usize,
    /// Data directory for the durable stores. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Path to the pre-built context index snapshot. `None` or a missing
    /// file means every narrative runs with empty context.
    pub context_index: Option<PathBuf>,
    /// Travel mode for routing.
    pub travel_mode: TravelMode,
    /// Generation oracle settings.
    pub generation: OllamaConfig,
    /// Embedding oracle settings.
    pub embedding: EmbedderConfig,
    /// Routing collaborator settings. `None` disables routing: journeys are
    /// planned with a narrative only.
    pub routing: Option<RouteConfig>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            data_dir: None,
            context_index: None,
            travel_mode: TravelMode::Walking,
            generation: OllamaConfig::default(),
            embedding: EmbedderConfig::default(),
            routing: None,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = PlannerConfig::default();
        assert_eq!(config.top_k, 5);
        assert!(config.data_dir.is_none());
        assert!(config.routing.is_none());
        assert_eq!(config.travel_mode, TravelMode::Walking);
        assert_eq!(config.generation.timeout_secs, 120);
        assert_eq!(config.embedding.timeout_secs, 20);
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wayscribe.toml");
        std::fs::write(
            &path,
            r#"
top_k = 3

[generation]
model = "llama3.2:70b"
"#,
        )
        .unwrap();

        let config = PlannerConfig::load(&path).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.generation.model, "llama3.2:70b");
        // Untouched sections keep their defaults.
        assert_eq!(config.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn load_missing_file_errors() {
        let result = PlannerConfig::load(Path::new("/nonexistent/wayscribe.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_invalid_toml_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wayscribe.toml");
        std::fs::write(&path, "top_k = \"five\"").unwrap();
        assert!(matches!(
            PlannerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
