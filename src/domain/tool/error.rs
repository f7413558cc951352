//! Tool failure classification

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// The call did not finish within the tool's declared timeout
    Timeout,
    /// The service rejected the call because of rate limiting
    RateLimited,
    /// The service answered with something that could not be decoded
    MalformedResponse,
    /// The service could not be reached or failed internally
    Unavailable,
    /// The call itself was invalid; retrying cannot help
    #[serde(rename = "validation_error")]
    Validation,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::RateLimited => "rate_limited",
            ToolErrorKind::MalformedResponse => "malformed_response",
            ToolErrorKind::Unavailable => "unavailable",
            ToolErrorKind::Validation => "validation_error",
        }
    }

    /// Whether a failure of this kind may be retried
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ToolErrorKind::Validation)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by every external collaborator
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{tool} failed ({kind}): {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub tool: String,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn timeout(tool: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            tool,
            format!("no response after {}ms", timeout_ms),
        )
    }

    pub fn rate_limited(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::RateLimited, tool, message)
    }

    pub fn malformed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::MalformedResponse, tool, message)
    }

    pub fn unavailable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Unavailable, tool, message)
    }

    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, tool, message)
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}
