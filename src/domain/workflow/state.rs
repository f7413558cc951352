//! Per-execution workflow state

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::node::NodeName;
use crate::domain::observability::{EventKind, LogEvent};
use crate::domain::quality::QualityAssessment;
use crate::domain::retrieval::{Chunk, Citation, DedupStats};
use crate::domain::tool::ToolCallRecord;

/// How candidates were retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchStrategy {
    Primary,
    Fallback,
    Hybrid,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Primary => "PRIMARY",
            SearchStrategy::Fallback => "FALLBACK",
            SearchStrategy::Hybrid => "HYBRID",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single value threaded through every node of one execution.
///
/// `search_strategy` and `fallback_triggered` are private so they can only
/// move forward: the strategy never returns to `PRIMARY` and broadening is
/// triggered at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub question: String,
    pub session_id: String,
    pub user_id: String,
    pub available_categories: BTreeSet<String>,
    pub routed_category: Option<String>,
    pub category_confidence: f32,
    /// Embedding of the question, absent until `embed` succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_vector: Option<Vec<f32>>,
    pub candidate_chunks: Vec<Chunk>,
    search_strategy: SearchStrategy,
    fallback_triggered: bool,
    /// Broaden with hybrid search rather than plain fallback search
    pub hybrid_enabled: bool,
    pub retry_count: u32,
    pub error_count: u32,
    pub errors: Vec<String>,
    pub recovery_actions: Vec<String>,
    pub final_answer: String,
    pub citations: Vec<Citation>,
    pub event_log: Vec<LogEvent>,
    /// Nodes executed so far, in order
    pub workflow_steps: Vec<String>,
    /// Non-terminal node executions counted against the ceiling
    pub iterations: u32,
    /// Set when the iteration ceiling forced termination
    #[serde(default)]
    pub iteration_limit_reached: bool,
    /// Set when validation rejected the request
    #[serde(default)]
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_stats: Option<DedupStats>,
    pub start_time: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(
        question: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        categories: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            available_categories: categories.into_iter().collect(),
            routed_category: None,
            category_confidence: 0.0,
            query_vector: None,
            candidate_chunks: Vec::new(),
            search_strategy: SearchStrategy::Primary,
            fallback_triggered: false,
            hybrid_enabled: false,
            retry_count: 0,
            error_count: 0,
            errors: Vec::new(),
            recovery_actions: Vec::new(),
            final_answer: String::new(),
            citations: Vec::new(),
            event_log: Vec::new(),
            workflow_steps: Vec::new(),
            iterations: 0,
            iteration_limit_reached: false,
            rejected: false,
            quality: None,
            dedup_stats: None,
            start_time: Utc::now(),
        }
    }

    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.hybrid_enabled = enabled;
        self
    }

    pub fn search_strategy(&self) -> SearchStrategy {
        self.search_strategy
    }

    pub fn fallback_triggered(&self) -> bool {
        self.fallback_triggered
    }

    /// Move to a broader strategy. Requests to go back to `PRIMARY` are
    /// ignored; returns whether the strategy changed.
    pub fn escalate_strategy(&mut self, strategy: SearchStrategy) -> bool {
        if strategy == SearchStrategy::Primary || strategy == self.search_strategy {
            return false;
        }
        self.search_strategy = strategy;
        true
    }

    /// Flip `fallback_triggered` and escalate the strategy.
    ///
    /// Returns `false` without touching anything when broadening already
    /// happened in this execution.
    pub fn trigger_fallback(&mut self, strategy: SearchStrategy) -> bool {
        if self.fallback_triggered {
            return false;
        }
        self.fallback_triggered = true;
        self.escalate_strategy(strategy);
        true
    }

    /// Strategy used when broadening is needed
    pub fn broadening_strategy(&self) -> SearchStrategy {
        if self.hybrid_enabled {
            SearchStrategy::Hybrid
        } else {
            SearchStrategy::Fallback
        }
    }

    /// Collection filter for primary retrieval; `None` searches everything
    pub fn collection_filter(&self) -> Option<&str> {
        if self.fallback_triggered {
            None
        } else {
            self.routed_category.as_deref()
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(message.into());
    }

    pub fn record_recovery(&mut self, node: NodeName, action: impl Into<String>) {
        let action = action.into();
        self.event_log
            .push(LogEvent::warning(EventKind::Recovery, action.clone()).with_node(node.as_str()));
        self.recovery_actions.push(action);
    }

    pub fn push_event(&mut self, node: NodeName, event: LogEvent) {
        self.event_log.push(event.with_node(node.as_str()));
    }

    /// Append tool-call records as events, attributed to `node`
    pub fn record_tool_calls(&mut self, node: NodeName, records: Vec<ToolCallRecord>) {
        self.event_log.extend(
            records
                .into_iter()
                .map(|r| LogEvent::tool_call(r).with_node(node.as_str())),
        );
    }

    /// Every tool call recorded so far
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.event_log.iter().filter_map(|e| e.tool_call.as_ref())
    }

    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.start_time).num_milliseconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tool::ToolName;
    use serde_json::json;

    fn state() -> WorkflowState {
        WorkflowState::new(
            "What is the refund policy?",
            "session-1",
            "user-1",
            vec!["billing".to_string(), "shipping".to_string()],
        )
    }

    #[test]
    fn test_new_state_defaults() {
        let state = state();
        assert_eq!(state.search_strategy(), SearchStrategy::Primary);
        assert!(!state.fallback_triggered());
        assert_eq!(state.available_categories.len(), 2);
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn test_fallback_flips_once() {
        let mut state = state();

        assert!(state.trigger_fallback(SearchStrategy::Fallback));
        assert!(state.fallback_triggered());
        assert_eq!(state.search_strategy(), SearchStrategy::Fallback);

        assert!(!state.trigger_fallback(SearchStrategy::Hybrid));
        assert!(state.fallback_triggered());
        assert_eq!(state.search_strategy(), SearchStrategy::Fallback);
    }

    #[test]
    fn test_strategy_never_returns_to_primary() {
        let mut state = state();
        state.escalate_strategy(SearchStrategy::Fallback);

        assert!(!state.escalate_strategy(SearchStrategy::Primary));
        assert_eq!(state.search_strategy(), SearchStrategy::Fallback);
    }

    #[test]
    fn test_collection_filter_widens_after_fallback() {
        let mut state = state();
        state.routed_category = Some("billing".to_string());
        assert_eq!(state.collection_filter(), Some("billing"));

        state.trigger_fallback(SearchStrategy::Fallback);
        assert_eq!(state.collection_filter(), None);
    }

    #[test]
    fn test_broadening_strategy_follows_hybrid_flag() {
        assert_eq!(state().broadening_strategy(), SearchStrategy::Fallback);
        assert_eq!(
            state().with_hybrid(true).broadening_strategy(),
            SearchStrategy::Hybrid
        );
    }

    #[test]
    fn test_error_and_recovery_bookkeeping() {
        let mut state = state();
        state.record_error("router timed out");
        state.record_recovery(NodeName::RouteCategory, "fallback after retries exhausted");

        assert_eq!(state.error_count, 1);
        assert_eq!(state.errors, vec!["router timed out"]);
        assert_eq!(state.recovery_actions.len(), 1);
        assert_eq!(state.event_log[0].kind, EventKind::Recovery);
        assert_eq!(state.event_log[0].node.as_deref(), Some("route_category"));
    }

    #[test]
    fn test_tool_calls_view() {
        let mut state = state();
        state.record_tool_calls(
            NodeName::Embed,
            vec![ToolCallRecord::success(ToolName::Embedder, json!({}), 1, 12)],
        );
        state.push_event(NodeName::Embed, LogEvent::info(EventKind::NodeCompleted, "done"));

        assert_eq!(state.tool_calls().count(), 1);
        assert_eq!(state.event_log.len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_private_flags() {
        let mut state = state();
        state.trigger_fallback(SearchStrategy::Hybrid);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["search_strategy"], "HYBRID");

        let restored: WorkflowState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
        assert!(restored.fallback_triggered());
    }
}
