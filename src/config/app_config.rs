use serde::Deserialize;

use crate::domain::quality::QualityConfig;
use crate::domain::retrieval::HybridConfig;
use crate::domain::tool::{RetryConfig, ToolsConfig};
use crate::domain::workflow::WorkflowConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub workflow: WorkflowConfig,
    pub retry: RetryConfig,
    pub tools: ToolsConfig,
    pub quality: QualityConfig,
    pub hybrid: HybridConfig,
    pub llm: LlmSettings,
    pub checkpoint: CheckpointSettings,
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// OpenAI-compatible endpoint used by every model-backed collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    pub backend: CheckpointBackend,
    pub postgres_url: Option<String>,
    pub table: String,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            postgres_url: None,
            table: "workflow_checkpoints".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Directory receiving one `<session_id>.jsonl` file per session
    pub log_dir: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_dir: "logs/sessions".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("RAG")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.workflow.max_iterations, 10);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.quality.min_chunks, 3);
        assert!((config.quality.min_avg_similarity - 0.30).abs() < f32::EPSILON);
        assert!((config.hybrid.vector_weight - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.checkpoint.backend, CheckpointBackend::Memory);
        assert_eq!(config.observability.log_dir, "logs/sessions");
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("workflow.max_iterations", 12)
            .unwrap()
            .set_override("checkpoint.backend", "postgres")
            .unwrap()
            .set_override("quality.min_chunks", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.workflow.max_iterations, 12);
        assert_eq!(config.workflow.top_k, 5);
        assert_eq!(config.checkpoint.backend, CheckpointBackend::Postgres);
        assert_eq!(config.quality.min_chunks, 5);
        assert!((config.quality.min_avg_similarity - 0.30).abs() < f32::EPSILON);
        assert_eq!(config.tools.answer_generator_timeout_ms, 60_000);
    }
}
