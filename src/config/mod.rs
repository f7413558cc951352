//! Configuration loading

mod app_config;

pub use app_config::{
    AppConfig, CheckpointBackend, CheckpointSettings, LlmSettings, LogFormat, LoggingConfig,
    ObservabilitySettings,
};
