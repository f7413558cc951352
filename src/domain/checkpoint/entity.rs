//! Checkpoint entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::workflow::{NodeName, WorkflowState};
use crate::domain::DomainError;

/// Immutable snapshot of a workflow state taken after a node committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub thread_id: String,
    /// Previous checkpoint of the same execution, for lineage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_checkpoint_id: Option<String>,
    /// Node that had just committed
    pub node: NodeName,
    /// Node a resume re-enters at; `None` once the execution finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<NodeName>,
    pub state_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Snapshot `state` under its session id
    pub fn capture(
        state: &WorkflowState,
        node: NodeName,
        next_node: Option<NodeName>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            checkpoint_id: format!("cp-{}", Uuid::new_v4()),
            thread_id: state.session_id.clone(),
            parent_checkpoint_id: None,
            node,
            next_node,
            state_snapshot: serde_json::to_value(state)?,
            created_at: Utc::now(),
        })
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent_checkpoint_id = parent;
        self
    }

    /// Rebuild the workflow state captured by this checkpoint
    pub fn restore_state(&self) -> Result<WorkflowState, DomainError> {
        Ok(serde_json::from_value(self.state_snapshot.clone())?)
    }

    /// Whether the execution had finished when this was taken
    pub fn is_final(&self) -> bool {
        self.next_node.is_none()
    }

    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            checkpoint_id: self.checkpoint_id.clone(),
            thread_id: self.thread_id.clone(),
            parent_checkpoint_id: self.parent_checkpoint_id.clone(),
            node: self.node,
            next_node: self.next_node,
            created_at: self.created_at,
        }
    }
}

/// Listing entry, without the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub checkpoint_id: String,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_checkpoint_id: Option<String>,
    pub node: NodeName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<NodeName>,
    pub created_at: DateTime<Utc>,
}

/// What a delete removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    Thread(String),
    All,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::SearchStrategy;

    #[test]
    fn test_capture_and_restore() {
        let mut state = WorkflowState::new("q", "thread-1", "user", vec!["a".to_string()]);
        state.trigger_fallback(SearchStrategy::Fallback);
        state.final_answer = "done".to_string();

        let checkpoint = Checkpoint::capture(&state, NodeName::FormatResponse, None).unwrap();

        assert!(checkpoint.checkpoint_id.starts_with("cp-"));
        assert_eq!(checkpoint.thread_id, "thread-1");
        assert!(checkpoint.is_final());
        assert_eq!(checkpoint.restore_state().unwrap(), state);
    }

    #[test]
    fn test_ids_are_unique() {
        let state = WorkflowState::new("q", "t", "u", Vec::<String>::new());
        let a = Checkpoint::capture(&state, NodeName::Validate, Some(NodeName::RouteCategory)).unwrap();
        let b = Checkpoint::capture(&state, NodeName::Validate, Some(NodeName::RouteCategory)).unwrap();
        assert_ne!(a.checkpoint_id, b.checkpoint_id);
        assert!(!a.is_final());
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let state = WorkflowState::new("q", "t", "u", Vec::<String>::new());
        let mut checkpoint = Checkpoint::capture(&state, NodeName::Embed, Some(NodeName::Retrieve)).unwrap();
        checkpoint.state_snapshot = serde_json::json!({"question": 42});

        assert!(matches!(
            checkpoint.restore_state(),
            Err(DomainError::Serialization { .. })
        ));
    }

    #[test]
    fn test_summary_drops_snapshot() {
        let state = WorkflowState::new("q", "t", "u", Vec::<String>::new());
        let checkpoint = Checkpoint::capture(&state, NodeName::Embed, Some(NodeName::Retrieve))
            .unwrap()
            .with_parent(Some("cp-parent".to_string()));

        let summary = checkpoint.summary();
        assert_eq!(summary.parent_checkpoint_id.as_deref(), Some("cp-parent"));
        assert_eq!(summary.next_node, Some(NodeName::Retrieve));
    }
}
