//! Category routing collaborator

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::tool::ToolError;

/// Routing decision for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecision {
    pub category: String,
    pub confidence: f32,
    #[serde(default)]
    pub reason: String,
}

impl CategoryDecision {
    pub fn new(category: impl Into<String>, confidence: f32) -> Self {
        Self {
            category: category.into(),
            confidence,
            reason: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Picks the most relevant category (collection) for a question
#[async_trait]
pub trait CategoryRouter: Send + Sync + Debug {
    async fn decide(
        &self,
        question: &str,
        categories: &[String],
    ) -> Result<CategoryDecision, ToolError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::tool::ToolErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Router that fails a scripted number of times before deciding
    #[derive(Debug)]
    pub struct MockCategoryRouter {
        decision: Option<CategoryDecision>,
        failures: u32,
        failure_kind: ToolErrorKind,
        hang: Option<Duration>,
        calls: AtomicU32,
    }

    impl MockCategoryRouter {
        pub fn new(category: impl Into<String>, confidence: f32) -> Self {
            Self {
                decision: Some(CategoryDecision::new(category, confidence)),
                failures: 0,
                failure_kind: ToolErrorKind::Timeout,
                hang: None,
                calls: AtomicU32::new(0),
            }
        }

        /// Router whose every call fails with `kind`
        pub fn failing(kind: ToolErrorKind) -> Self {
            Self {
                decision: None,
                failures: u32::MAX,
                failure_kind: kind,
                hang: None,
                calls: AtomicU32::new(0),
            }
        }

        /// Router whose every call outlives any reasonable timeout
        pub fn hanging(duration: Duration) -> Self {
            Self {
                hang: Some(duration),
                ..Self::failing(ToolErrorKind::Timeout)
            }
        }

        pub fn with_failures(mut self, failures: u32, kind: ToolErrorKind) -> Self {
            self.failures = failures;
            self.failure_kind = kind;
            self
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CategoryRouter for MockCategoryRouter {
        async fn decide(
            &self,
            _question: &str,
            _categories: &[String],
        ) -> Result<CategoryDecision, ToolError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(duration) = self.hang {
                tokio::time::sleep(duration).await;
            }

            if call < self.failures {
                return Err(ToolError::new(
                    self.failure_kind,
                    "category_router",
                    "scripted failure",
                ));
            }

            self.decision
                .clone()
                .ok_or_else(|| ToolError::malformed("category_router", "no decision scripted"))
        }
    }
}
