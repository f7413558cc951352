//! Structured workflow events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::tool::ToolCallRecord;

/// Severity of an event or live notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NodeStarted,
    NodeCompleted,
    NodeFailed,
    ToolCall,
    Retry,
    Fallback,
    Recovery,
    Quality,
    Deduplication,
    Rerank,
    IterationLimit,
    Checkpoint,
    Completed,
}

impl EventKind {
    /// Transitions worth surfacing to a user watching progress
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EventKind::Retry
                | EventKind::Fallback
                | EventKind::Recovery
                | EventKind::NodeFailed
                | EventKind::IterationLimit
                | EventKind::Completed
        )
    }
}

/// One entry of the in-memory event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRecord>,
}

impl LogEvent {
    pub fn new(kind: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            node: None,
            kind,
            severity,
            message: message.into(),
            tool_call: None,
        }
    }

    pub fn info(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn warning(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn error(kind: EventKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    pub fn tool_call(record: ToolCallRecord) -> Self {
        let severity = if record.success {
            Severity::Info
        } else {
            Severity::Warning
        };
        let message = format!(
            "{} attempt {} {} in {}ms",
            record.tool_name,
            record.attempt,
            record.outcome(),
            record.elapsed_ms
        );

        Self {
            tool_call: Some(record),
            ..Self::new(EventKind::ToolCall, severity, message)
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}
