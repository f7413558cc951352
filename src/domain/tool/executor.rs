//! Retry executor wrapping every external tool call

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::error::ToolError;
use super::record::{ToolCallRecord, ToolName};
use super::registry::ToolRegistry;
use super::retry::RetryConfig;
use crate::domain::observability::{ActivityCallback, Severity};

/// Outcome of one tool invocation, including every attempt made
#[derive(Debug)]
pub struct ToolInvocation<T> {
    /// Final result; on failure, the error of the last attempt
    pub result: Result<T, ToolError>,
    /// One record per attempt, in order
    pub records: Vec<ToolCallRecord>,
    /// Number of retries consumed (attempts minus one)
    pub retries: u32,
}

impl<T> ToolInvocation<T> {
    fn rejected(error: ToolError) -> Self {
        Self {
            result: Err(error),
            records: Vec::new(),
            retries: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn attempts(&self) -> usize {
        self.records.len()
    }
}

/// Executes registered tools with timing, classification, and backoff retry.
///
/// Recoverable failures are retried until the caller-provided retry budget or
/// the configured maximum is exhausted, whichever is smaller. Validation
/// failures are returned immediately.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    retry: RetryConfig,
    callback: Arc<dyn ActivityCallback>,
}

impl ToolExecutor {
    pub fn new(
        registry: ToolRegistry,
        retry: RetryConfig,
        callback: Arc<dyn ActivityCallback>,
    ) -> Self {
        Self {
            registry,
            retry,
            callback,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke `op` as `tool`, retrying recoverable failures.
    ///
    /// `retry_budget` is how many retries the current execution may still
    /// spend; it is never exceeded.
    pub async fn invoke<T, F, Fut>(
        &self,
        tool: ToolName,
        arguments: Value,
        retry_budget: u32,
        mut op: F,
    ) -> ToolInvocation<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let Some(spec) = self.registry.get(tool).copied() else {
            return ToolInvocation::rejected(ToolError::validation(
                tool.as_str(),
                "tool is not registered",
            ));
        };

        let max_retries = retry_budget.min(self.retry.max_retries);
        let mut records = Vec::new();
        let mut retries = 0;

        loop {
            let attempt = retries + 1;
            let start = Instant::now();

            let outcome = match tokio::time::timeout(spec.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::timeout(tool.as_str(), spec.timeout_ms())),
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;

            let error = match outcome {
                Ok(value) => {
                    debug!(tool = %tool, attempt, elapsed_ms, "Tool call succeeded");
                    records.push(ToolCallRecord::success(
                        tool,
                        arguments.clone(),
                        attempt,
                        elapsed_ms,
                    ));

                    return ToolInvocation {
                        result: Ok(value),
                        records,
                        retries,
                    };
                }
                Err(error) => error,
            };

            warn!(
                tool = %tool,
                attempt,
                elapsed_ms,
                error_type = %error.kind,
                "Tool call failed: {}",
                error.message
            );
            records.push(ToolCallRecord::failure(
                tool,
                arguments.clone(),
                attempt,
                elapsed_ms,
                error.kind,
            ));

            if !error.is_recoverable() || retries >= max_retries {
                return ToolInvocation {
                    result: Err(error),
                    records,
                    retries,
                };
            }

            let delay = self.retry.delay_for_retry(retries);
            self.callback.notify(
                &format!(
                    "{} failed ({}), retrying in {}ms",
                    tool,
                    error.kind,
                    delay.as_millis()
                ),
                Severity::Warning,
            );

            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}
