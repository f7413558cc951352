//! Workflow error types

use thiserror::Error;

use crate::domain::tool::{ToolCallRecord, ToolError, ToolName};
use crate::domain::DomainError;

/// Errors surfaced to the caller of the runner
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Checkpoint not found: {checkpoint_id} (thread {thread_id})")]
    CheckpointNotFound {
        thread_id: String,
        checkpoint_id: String,
    },

    #[error("Checkpoint store error: {0}")]
    Checkpoint(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Cannot resume: {0}")]
    InvalidResume(String),
}

impl WorkflowError {
    pub fn checkpoint_not_found(thread_id: impl Into<String>, checkpoint_id: impl Into<String>) -> Self {
        Self::CheckpointNotFound {
            thread_id: thread_id.into(),
            checkpoint_id: checkpoint_id.into(),
        }
    }

    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }

    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot(message.into())
    }

    pub fn invalid_resume(message: impl Into<String>) -> Self {
        Self::InvalidResume(message.into())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(e: DomainError) -> Self {
        Self::Checkpoint(e.to_string())
    }
}

/// Whether the runner may route around a node failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retries were exhausted on a timeout, rate limit or outage
    Recoverable,
    /// Bad input or a rejected request; retrying cannot help
    NonRecoverable,
}

/// A node aborted without committing its changes.
///
/// The tool-call accounting made before the abort travels with the error so
/// the runner can still audit every attempt.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct NodeError {
    pub class: ErrorClass,
    pub message: String,
    pub tool: Option<ToolName>,
    pub records: Vec<ToolCallRecord>,
    pub retries: u32,
}

impl NodeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::NonRecoverable,
            message: message.into(),
            tool: None,
            records: Vec::new(),
            retries: 0,
        }
    }

    /// Classify a failed tool invocation by its last error
    pub fn from_tool(
        tool: ToolName,
        error: ToolError,
        records: Vec<ToolCallRecord>,
        retries: u32,
    ) -> Self {
        let class = if error.is_recoverable() {
            ErrorClass::Recoverable
        } else {
            ErrorClass::NonRecoverable
        };

        Self {
            class,
            message: error.to_string(),
            tool: Some(tool),
            records,
            retries,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.class == ErrorClass::Recoverable
    }
}
