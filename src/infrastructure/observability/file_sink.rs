//! Per-session JSON Lines log files

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::observability::{AggregatedLog, DurableLogSink};
use crate::domain::DomainError;

/// Appends each aggregated log as one JSON line to `<log_dir>/<session_id>.jsonl`
#[derive(Debug, Clone)]
pub struct FileLogSink {
    log_dir: PathBuf,
}

impl FileLogSink {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// File a session's log is written to. Characters outside
    /// `[A-Za-z0-9_-]` are replaced so a session id cannot escape `log_dir`.
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let name = if safe.is_empty() { "anonymous".to_string() } else { safe };

        self.log_dir.join(format!("{}.jsonl", name))
    }
}

#[async_trait]
impl DurableLogSink for FileLogSink {
    async fn write(&self, session_id: &str, log: &AggregatedLog) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create log directory: {}", e)))?;

        let mut line = serde_json::to_string(log)?;
        line.push('\n');

        let path = self.path_for(session_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to open {}: {}", path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write {}: {}", path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to flush {}: {}", path.display(), e)))?;

        debug!(session_id, path = %path.display(), "Session log written");
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "file"
    }
}

/// Accepts and drops every log
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogSink;

#[async_trait]
impl DurableLogSink for NoopLogSink {
    async fn write(&self, _session_id: &str, _log: &AggregatedLog) -> Result<(), DomainError> {
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "noop"
    }
}
