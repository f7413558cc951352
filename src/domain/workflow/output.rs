//! Output contract returned to the caller

use serde::{Deserialize, Serialize};

use super::state::WorkflowState;
use crate::domain::retrieval::Citation;

/// Terminal status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Answered without any recorded error
    Completed,
    /// Answered on a degraded path (errors or recovery actions recorded)
    CompletedWithErrors,
    /// Validation failed; no tool was called
    Rejected,
    /// The iteration ceiling forced termination
    IterationLimit,
    /// Stopped after the requested node; resumable from its checkpoint
    Paused,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::CompletedWithErrors => "completed_with_errors",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::IterationLimit => "iteration_limit",
            WorkflowStatus::Paused => "paused",
        }
    }

    /// Status of a finished (not paused) execution
    pub fn of(state: &WorkflowState) -> Self {
        if state.rejected {
            WorkflowStatus::Rejected
        } else if state.iteration_limit_reached {
            WorkflowStatus::IterationLimit
        } else if state.error_count > 0 || !state.recovery_actions.is_empty() {
            WorkflowStatus::CompletedWithErrors
        } else {
            WorkflowStatus::Completed
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLog {
    pub total_time_ms: u64,
    pub status: WorkflowStatus,
    pub error_count: u32,
    pub retry_count: u32,
    pub chunk_count: usize,
    pub recovery_actions: Vec<String>,
}

/// What the caller receives for every execution, including degraded ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub session_id: String,
    pub final_answer: String,
    pub citations: Vec<Citation>,
    pub workflow_steps: Vec<String>,
    pub error_messages: Vec<String>,
    pub routed_category: Option<String>,
    pub search_strategy: String,
    pub fallback_triggered: bool,
    pub workflow_log: WorkflowLog,
    /// Checkpoint written for this execution, when one was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
}

impl WorkflowOutput {
    pub fn from_state(state: &WorkflowState, status: WorkflowStatus) -> Self {
        Self {
            session_id: state.session_id.clone(),
            final_answer: state.final_answer.clone(),
            citations: state.citations.clone(),
            workflow_steps: state.workflow_steps.clone(),
            error_messages: state.errors.clone(),
            routed_category: state.routed_category.clone(),
            search_strategy: state.search_strategy().as_str().to_string(),
            fallback_triggered: state.fallback_triggered(),
            workflow_log: WorkflowLog {
                total_time_ms: state.elapsed_ms(),
                status,
                error_count: state.error_count,
                retry_count: state.retry_count,
                chunk_count: state.candidate_chunks.len(),
                recovery_actions: state.recovery_actions.clone(),
            },
            checkpoint_id: None,
        }
    }

    pub fn with_checkpoint(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    pub fn status(&self) -> WorkflowStatus {
        self.workflow_log.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{NodeName, SearchStrategy};

    fn state() -> WorkflowState {
        WorkflowState::new("q", "s-1", "u-1", Vec::<String>::new())
    }

    #[test]
    fn test_status_of_clean_run() {
        assert_eq!(WorkflowStatus::of(&state()), WorkflowStatus::Completed);
    }

    #[test]
    fn test_status_precedence() {
        let mut state = state();
        state.record_recovery(NodeName::Rerank, "kept retrieval order");
        assert_eq!(WorkflowStatus::of(&state), WorkflowStatus::CompletedWithErrors);

        state.iteration_limit_reached = true;
        assert_eq!(WorkflowStatus::of(&state), WorkflowStatus::IterationLimit);

        state.rejected = true;
        assert_eq!(WorkflowStatus::of(&state), WorkflowStatus::Rejected);
    }

    #[test]
    fn test_output_mirrors_state() {
        let mut state = state();
        state.routed_category = Some("billing".to_string());
        state.trigger_fallback(SearchStrategy::Fallback);
        state.retry_count = 2;
        state.record_error("router timed out");
        state.final_answer = "answer".to_string();

        let output = WorkflowOutput::from_state(&state, WorkflowStatus::of(&state));

        assert_eq!(output.search_strategy, "FALLBACK");
        assert!(output.fallback_triggered);
        assert_eq!(output.error_messages, vec!["router timed out"]);
        assert_eq!(output.workflow_log.retry_count, 2);
        assert_eq!(output.workflow_log.error_count, 1);
        assert_eq!(output.status(), WorkflowStatus::CompletedWithErrors);
        assert!(output.checkpoint_id.is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkflowStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, "\"completed_with_errors\"");
    }
}
