//! Workflow executor implementation
//!
//! Drives the node graph as a bounded loop. Each node runs against a clone of
//! the committed state; the clone replaces the state only when the node
//! returns `Ok`, so a failing node cannot leave half-written fields behind.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::nodes::{broadening_node, Collaborators, ExecutorSettings, WorkflowNodes};
use crate::domain::checkpoint::{Checkpoint, CheckpointStore};
use crate::domain::observability::{AggregatedLog, EventKind, LogEvent};
use crate::domain::workflow::{
    NodeError, NodeName, SearchStrategy, WorkflowError, WorkflowExecutor, WorkflowOutput,
    WorkflowRequest, WorkflowState, WorkflowStatus,
};
use crate::infrastructure::observability::ObservabilityChannel;

/// Error recorded when the iteration ceiling cuts an execution short
pub const ITERATION_LIMIT_REACHED: &str = "iteration limit reached";

/// Recovery action recorded when a tool failure escalates to the broader search
pub const FALLBACK_AFTER_RETRIES: &str = "fallback after retries exhausted";

/// Workflow executor implementation
#[derive(Debug)]
pub struct WorkflowExecutorImpl {
    nodes: WorkflowNodes,
    checkpoints: Arc<dyn CheckpointStore>,
    channel: ObservabilityChannel,
    settings: ExecutorSettings,
}

impl WorkflowExecutorImpl {
    /// Create an executor with default settings
    pub fn new(
        collaborators: Collaborators,
        checkpoints: Arc<dyn CheckpointStore>,
        channel: ObservabilityChannel,
    ) -> Self {
        Self::with_settings(collaborators, checkpoints, channel, ExecutorSettings::default())
    }

    /// Create with custom settings
    pub fn with_settings(
        collaborators: Collaborators,
        checkpoints: Arc<dyn CheckpointStore>,
        channel: ObservabilityChannel,
        settings: ExecutorSettings,
    ) -> Self {
        let nodes = WorkflowNodes::new(collaborators, &settings, channel.callback());

        Self {
            nodes,
            checkpoints,
            channel,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Wait for pending durable log writes
    pub async fn flush_logs(&self) {
        self.channel.flush().await;
    }

    /// Run nodes from `entry` until the terminal node or a requested pause
    async fn drive(
        &self,
        mut state: WorkflowState,
        entry: NodeName,
        mut parent: Option<String>,
        pause_after: Option<NodeName>,
    ) -> Result<WorkflowOutput, WorkflowError> {
        let max_iterations = self.settings.workflow.max_iterations;
        let mut next = Some(entry);
        let mut last_checkpoint = None;

        while let Some(mut node) = next {
            let events_before = state.event_log.len();

            if !node.is_terminal() && state.iterations >= max_iterations {
                warn!(
                    session_id = %state.session_id,
                    node = %node,
                    iterations = state.iterations,
                    "Iteration limit reached, jumping to format_response"
                );
                state.iteration_limit_reached = true;
                state.record_error(ITERATION_LIMIT_REACHED);
                state.push_event(
                    node,
                    LogEvent::warning(
                        EventKind::IterationLimit,
                        format!("{} before {}", ITERATION_LIMIT_REACHED, node),
                    ),
                );
                node = NodeName::FormatResponse;
            }

            if !node.is_terminal() {
                state.iterations += 1;
            }
            state.workflow_steps.push(node.as_str().to_string());

            debug!(
                session_id = %state.session_id,
                node = %node,
                iteration = state.iterations,
                "Executing node"
            );

            let mut draft = state.clone();
            next = match self.nodes.execute(node, &mut draft).await {
                Ok(next) => {
                    state = draft;
                    next
                }
                Err(error) => Some(self.recover(node, error, &mut state)),
            };

            for event in &state.event_log[events_before..] {
                self.channel.emit(event);
            }

            let finished = next.is_none();
            let pausing = !finished && pause_after == Some(node);
            last_checkpoint = None;

            if finished || pausing || self.settings.workflow.checkpoint_each_node {
                match self.write_checkpoint(&state, node, next, parent.clone()).await {
                    Ok(checkpoint_id) => {
                        state.push_event(
                            node,
                            LogEvent::info(
                                EventKind::Checkpoint,
                                format!("checkpoint {} written", checkpoint_id),
                            ),
                        );
                        parent = Some(checkpoint_id.clone());
                        last_checkpoint = Some(checkpoint_id);
                    }
                    Err(e) if pausing => return Err(e),
                    Err(e) => {
                        warn!(
                            session_id = %state.session_id,
                            node = %node,
                            error = %e,
                            "Checkpoint write failed"
                        );
                        state.push_event(
                            node,
                            LogEvent::warning(
                                EventKind::Checkpoint,
                                format!("checkpoint write failed: {}", e),
                            ),
                        );
                    }
                }
            }

            if pausing {
                if let Some(checkpoint_id) = last_checkpoint {
                    info!(
                        session_id = %state.session_id,
                        node = %node,
                        checkpoint_id = %checkpoint_id,
                        "Execution paused"
                    );
                    return Ok(WorkflowOutput::from_state(&state, WorkflowStatus::Paused)
                        .with_checkpoint(checkpoint_id));
                }
            }
        }

        Ok(self.finish(state, last_checkpoint))
    }

    /// Commit a failed node's accounting and pick the node to continue with
    fn recover(&self, node: NodeName, error: NodeError, state: &mut WorkflowState) -> NodeName {
        let recoverable = error.is_recoverable();
        let NodeError {
            message,
            records,
            retries,
            ..
        } = error;

        warn!(
            session_id = %state.session_id,
            node = %node,
            recoverable,
            retries,
            "Node failed: {}",
            message
        );

        state.retry_count += retries;
        state.record_tool_calls(node, records);
        state.push_event(
            node,
            LogEvent::error(EventKind::NodeFailed, format!("{} failed: {}", node, message)),
        );
        state.record_error(message);

        if node == NodeName::Validate {
            state.rejected = true;
            return NodeName::FormatResponse;
        }

        if !recoverable {
            return NodeName::FormatResponse;
        }

        match node {
            NodeName::RouteCategory => {
                let strategy = state.broadening_strategy();
                state.trigger_fallback(strategy);
                state.routed_category = None;
                state.record_recovery(node, FALLBACK_AFTER_RETRIES);
                NodeName::Embed
            }
            NodeName::Embed => {
                let strategy = state.broadening_strategy();
                if state.trigger_fallback(strategy) {
                    state.record_recovery(node, FALLBACK_AFTER_RETRIES);
                } else {
                    state.record_recovery(
                        node,
                        "no query vector; broadened search uses keyword ranking",
                    );
                }
                broadening_node(state)
            }
            NodeName::Retrieve => {
                let strategy = state.broadening_strategy();
                if state.trigger_fallback(strategy) {
                    state.record_recovery(node, FALLBACK_AFTER_RETRIES);
                    broadening_node(state)
                } else {
                    state.record_recovery(
                        node,
                        "retrieval failed after broadening; continuing without results",
                    );
                    NodeName::Deduplicate
                }
            }
            NodeName::FallbackRetrieve | NodeName::HybridMerge => {
                state.record_recovery(
                    node,
                    "broadened search failed; continuing with primary results",
                );
                NodeName::Deduplicate
            }
            _ => NodeName::FormatResponse,
        }
    }

    async fn write_checkpoint(
        &self,
        state: &WorkflowState,
        node: NodeName,
        next: Option<NodeName>,
        parent: Option<String>,
    ) -> Result<String, WorkflowError> {
        let checkpoint = Checkpoint::capture(state, node, next)?.with_parent(parent);
        let checkpoint_id = checkpoint.checkpoint_id.clone();

        self.checkpoints.put(&state.session_id, checkpoint).await?;

        debug!(
            session_id = %state.session_id,
            checkpoint_id = %checkpoint_id,
            node = %node,
            "Checkpoint written"
        );

        Ok(checkpoint_id)
    }

    /// Build the output and hand the aggregated log to the durable sink
    fn finish(&self, state: WorkflowState, checkpoint_id: Option<String>) -> WorkflowOutput {
        let status = WorkflowStatus::of(&state);
        let mut output = WorkflowOutput::from_state(&state, status);
        if let Some(checkpoint_id) = checkpoint_id {
            output = output.with_checkpoint(checkpoint_id);
        }

        info!(
            session_id = %state.session_id,
            status = %status,
            search_strategy = %state.search_strategy(),
            fallback_triggered = state.fallback_triggered(),
            retry_count = state.retry_count,
            error_count = state.error_count,
            citations = state.citations.len(),
            total_time_ms = output.workflow_log.total_time_ms,
            "Workflow finished"
        );

        // Detached; the answer never waits on the durable write
        self.channel.persist(AggregatedLog {
            session_id: state.session_id,
            user_id: state.user_id,
            question: state.question,
            summary: output.workflow_log.clone(),
            errors: state.errors,
            events: state.event_log,
            written_at: Utc::now(),
        });

        output
    }
}

#[async_trait]
impl WorkflowExecutor for WorkflowExecutorImpl {
    async fn run(&self, request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        let hybrid = request
            .hybrid
            .unwrap_or(self.settings.workflow.hybrid_enabled);

        info!(
            session_id = %request.session_id,
            user_id = %request.user_id,
            categories = request.categories.len(),
            hybrid,
            "Executing workflow"
        );

        let state = WorkflowState::new(
            request.question,
            request.session_id,
            request.user_id,
            request.categories,
        )
        .with_hybrid(hybrid);

        self.drive(state, NodeName::Validate, None, request.pause_after)
            .await
    }

    async fn resume(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<WorkflowOutput, WorkflowError> {
        let checkpoint = self
            .checkpoints
            .get(thread_id, checkpoint_id)
            .await?
            .ok_or_else(|| WorkflowError::checkpoint_not_found(thread_id, checkpoint_id))?;

        let state = checkpoint
            .restore_state()
            .map_err(|e| WorkflowError::invalid_snapshot(e.to_string()))?;

        let Some(next) = checkpoint.next_node else {
            debug!(thread_id, checkpoint_id, "Replaying finished execution");
            let status = WorkflowStatus::of(&state);
            return Ok(WorkflowOutput::from_state(&state, status)
                .with_checkpoint(checkpoint.checkpoint_id));
        };

        info!(
            thread_id,
            checkpoint_id,
            node = %next,
            "Resuming workflow"
        );

        self.drive(state, next, Some(checkpoint.checkpoint_id), None)
            .await
    }
}
