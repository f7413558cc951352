//! Durable, best-effort log persistence

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use super::event::LogEvent;
use crate::domain::workflow::WorkflowLog;
use crate::domain::DomainError;

/// Everything recorded about one execution, written once it completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedLog {
    pub session_id: String,
    pub user_id: String,
    pub question: String,
    pub summary: WorkflowLog,
    pub errors: Vec<String>,
    pub events: Vec<LogEvent>,
    pub written_at: DateTime<Utc>,
}

/// Destination for aggregated per-session logs.
///
/// Callers never await this on the answer path; see `ObservabilityChannel`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DurableLogSink: Send + Sync + Debug {
    async fn write(&self, session_id: &str, log: &AggregatedLog) -> Result<(), DomainError>;

    fn sink_name(&self) -> &'static str;
}
