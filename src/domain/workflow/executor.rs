//! Workflow executor trait and request type

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::node::NodeName;
use super::output::WorkflowOutput;

/// One question to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub question: String,
    /// Also the checkpoint thread id
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Overrides the configured hybrid switch for this execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<bool>,
    /// Stop and checkpoint once this node has committed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_after: Option<NodeName>,
}

impl WorkflowRequest {
    pub fn new(
        question: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            categories: Vec::new(),
            hybrid: None,
            pause_after: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.hybrid = Some(enabled);
        self
    }

    pub fn with_pause_after(mut self, node: NodeName) -> Self {
        self.pause_after = Some(node);
        self
    }
}

/// Runs the node graph for a request
#[async_trait]
pub trait WorkflowExecutor: Send + Sync + std::fmt::Debug {
    /// Answer a question.
    ///
    /// Degraded executions still produce an output; `Err` is reserved for
    /// a pause whose checkpoint could not be written.
    async fn run(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError>;

    /// Continue an execution from a stored checkpoint
    async fn resume(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<WorkflowOutput, WorkflowError>;
}
