use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::tool::{ToolError, ToolErrorKind, ToolName};

/// Failure of one HTTP exchange, already classified for the retry executor
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HttpError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl HttpError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a non-success status code
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => ToolErrorKind::RateLimited,
            408 | 504 => ToolErrorKind::Timeout,
            500..=599 => ToolErrorKind::Unavailable,
            _ => ToolErrorKind::Validation,
        };

        Self::new(kind, format!("HTTP {}: {}", status, body))
    }

    pub fn into_tool_error(self, tool: ToolName) -> ToolError {
        ToolError::new(self.kind, tool.as_str(), self.message)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            ToolErrorKind::Timeout
        } else if e.is_decode() {
            ToolErrorKind::MalformedResponse
        } else if let Some(status) = e.status() {
            return Self::from_status(status.as_u16(), &e.to_string());
        } else {
            ToolErrorKind::Unavailable
        };

        Self::new(kind, format!("Request failed: {}", e))
    }
}

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Client with a transport-level timeout.
    ///
    /// The retry executor enforces per-tool timeouts; this one only bounds a
    /// connection that never answers.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HttpError::new(
                    ToolErrorKind::Validation,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(HttpError::from_status(status.as_u16(), &error_body));
        }

        response.json().await.map_err(|e| {
            HttpError::new(
                ToolErrorKind::MalformedResponse,
                format!("Failed to parse response: {}", e),
            )
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(HttpError::from_status(429, "").kind, ToolErrorKind::RateLimited);
        assert_eq!(HttpError::from_status(400, "").kind, ToolErrorKind::Validation);
        assert_eq!(HttpError::from_status(422, "").kind, ToolErrorKind::Validation);
        assert_eq!(HttpError::from_status(401, "").kind, ToolErrorKind::Validation);
        assert_eq!(HttpError::from_status(503, "").kind, ToolErrorKind::Unavailable);
        assert_eq!(HttpError::from_status(504, "").kind, ToolErrorKind::Timeout);
    }

    #[test]
    fn test_into_tool_error_keeps_kind() {
        let error = HttpError::from_status(500, "boom").into_tool_error(ToolName::Embedder);

        assert_eq!(error.kind, ToolErrorKind::Unavailable);
        assert_eq!(error.tool, "embedder");
        assert!(error.message.contains("boom"));
    }
}
