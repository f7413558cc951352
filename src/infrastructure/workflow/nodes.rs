//! Node implementations
//!
//! Every node works on a draft of the workflow state owned by the runner and
//! returns the next node to run (`None` after `format_response`). A node that
//! returns `Err` has its draft discarded.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::embedding::Embedder;
use crate::domain::llm::{AnswerGenerator, CategoryRouter, RelevanceJudge};
use crate::domain::observability::{ActivityCallback, EventKind, LogEvent};
use crate::domain::quality::{QualityConfig, QualityEvaluator};
use crate::domain::rerank::{keep_order, rerank};
use crate::domain::retrieval::{deduplicate, fuse, Chunk, HybridConfig, VectorStore};
use crate::domain::tool::{
    RetryConfig, ToolError, ToolExecutor, ToolInvocation, ToolName, ToolRegistry, ToolsConfig,
};
use crate::domain::workflow::{
    NodeError, NodeName, SearchStrategy, WorkflowConfig, WorkflowState, WorkflowStatus,
};

/// Answer used when nothing could be generated from the retrieved context
pub const NO_ANSWER_MESSAGE: &str =
    "I'm sorry, I couldn't find enough information to answer your question.";

/// Error recorded when validation rejects a blank question
pub const EMPTY_QUESTION: &str = "empty question";

/// External collaborators the nodes call through the tool executor
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub router: Arc<dyn CategoryRouter>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub judge: Arc<dyn RelevanceJudge>,
}

/// Tunables shared by the runner and the nodes
#[derive(Debug, Clone, Default)]
pub struct ExecutorSettings {
    pub workflow: WorkflowConfig,
    pub retry: RetryConfig,
    pub tools: ToolsConfig,
    pub quality: QualityConfig,
    pub hybrid: HybridConfig,
}

/// The node set of the graph, bound to its collaborators
#[derive(Debug, Clone)]
pub struct WorkflowNodes {
    collaborators: Collaborators,
    tools: ToolExecutor,
    workflow: WorkflowConfig,
    quality: QualityEvaluator,
    hybrid: HybridConfig,
}

/// Commit the accounting of a successful invocation, or carry it in the error
fn settle<T>(
    node: NodeName,
    tool: ToolName,
    state: &mut WorkflowState,
    invocation: ToolInvocation<T>,
) -> Result<T, NodeError> {
    let ToolInvocation {
        result,
        records,
        retries,
    } = invocation;

    match result {
        Ok(value) => {
            state.retry_count += retries;
            state.record_tool_calls(node, records);
            Ok(value)
        }
        Err(e) => Err(NodeError::from_tool(tool, e, records, retries)),
    }
}

/// Commit the accounting of an invocation whose failure the node tolerates
fn absorb<T>(
    node: NodeName,
    state: &mut WorkflowState,
    invocation: ToolInvocation<T>,
) -> Result<T, ToolError> {
    state.retry_count += invocation.retries;
    state.record_tool_calls(node, invocation.records);
    invocation.result
}

/// Retries for the (vector, keyword) sides of a hybrid search
fn split_budget(budget: u32, has_vector: bool) -> (u32, u32) {
    if !has_vector {
        return (0, budget);
    }
    let keyword = budget / 2;
    (budget - keyword, keyword)
}

fn chunk_ids(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.id.as_str()).collect()
}

impl WorkflowNodes {
    pub fn new(
        collaborators: Collaborators,
        settings: &ExecutorSettings,
        callback: Arc<dyn ActivityCallback>,
    ) -> Self {
        let tools = ToolExecutor::new(
            ToolRegistry::from_config(&settings.tools),
            settings.retry.clone(),
            callback,
        );

        Self {
            collaborators,
            tools,
            workflow: settings.workflow.clone(),
            quality: QualityEvaluator::new(settings.quality.clone()),
            hybrid: settings.hybrid.clone(),
        }
    }

    /// Retries the execution may still spend
    fn budget(&self, state: &WorkflowState) -> u32 {
        self.tools
            .retry_config()
            .max_retries
            .saturating_sub(state.retry_count)
    }

    pub async fn execute(
        &self,
        node: NodeName,
        state: &mut WorkflowState,
    ) -> Result<Option<NodeName>, NodeError> {
        match node {
            NodeName::Validate => self.validate(state),
            NodeName::RouteCategory => self.route_category(state).await,
            NodeName::Embed => self.embed(state).await,
            NodeName::Retrieve => self.retrieve(state).await,
            NodeName::EvaluateQuality => Ok(self.evaluate_quality(state)),
            NodeName::FallbackRetrieve => self.fallback_retrieve(state).await,
            NodeName::HybridMerge => self.hybrid_merge(state).await,
            NodeName::Deduplicate => Ok(self.deduplicate(state)),
            NodeName::Rerank => Ok(self.rerank(state).await),
            NodeName::GenerateAnswer => self.generate_answer(state).await,
            NodeName::FormatResponse => Ok(self.format_response(state)),
        }
    }

    fn validate(&self, state: &mut WorkflowState) -> Result<Option<NodeName>, NodeError> {
        if state.question.trim().is_empty() {
            return Err(NodeError::validation(EMPTY_QUESTION));
        }

        let chars = state.question.chars().count();
        if chars > self.workflow.max_question_chars {
            return Err(NodeError::validation(format!(
                "question exceeds {} characters",
                self.workflow.max_question_chars
            )));
        }

        Ok(NodeName::Validate.default_next())
    }

    async fn route_category(
        &self,
        state: &mut WorkflowState,
    ) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::RouteCategory;

        if state.available_categories.is_empty() {
            state.push_event(
                NODE,
                LogEvent::info(EventKind::NodeCompleted, "no categories available; searching all"),
            );
            return Ok(NODE.default_next());
        }

        let categories: Vec<String> = state.available_categories.iter().cloned().collect();
        let invocation = {
            let router = self.collaborators.router.as_ref();
            let question = state.question.as_str();
            let cats = categories.as_slice();
            self.tools
                .invoke(
                    ToolName::CategoryRouter,
                    json!({ "question": question, "categories": cats }),
                    self.budget(state),
                    move || router.decide(question, cats),
                )
                .await
        };

        let decision = settle(NODE, ToolName::CategoryRouter, state, invocation)?;

        let known = state.available_categories.contains(&decision.category);
        if known && decision.confidence >= self.workflow.min_routing_confidence {
            info!(
                session_id = %state.session_id,
                category = %decision.category,
                confidence = decision.confidence,
                "Question routed"
            );
            state.push_event(
                NODE,
                LogEvent::info(
                    EventKind::NodeCompleted,
                    format!(
                        "routed to '{}' (confidence {:.2})",
                        decision.category, decision.confidence
                    ),
                ),
            );
            state.category_confidence = decision.confidence;
            state.routed_category = Some(decision.category);
        } else {
            let reason = if known { "low confidence" } else { "unknown category" };
            state.record_recovery(
                NODE,
                format!(
                    "ignored routing decision '{}' ({:.2}, {}); searching all categories",
                    decision.category, decision.confidence, reason
                ),
            );
            state.category_confidence = decision.confidence;
            state.routed_category = None;
        }

        Ok(NODE.default_next())
    }

    async fn embed(&self, state: &mut WorkflowState) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::Embed;

        let invocation = {
            let embedder = self.collaborators.embedder.as_ref();
            let question = state.question.as_str();
            self.tools
                .invoke(
                    ToolName::Embedder,
                    json!({ "text": question, "embedder": embedder.embedder_name() }),
                    self.budget(state),
                    move || embedder.embed(question),
                )
                .await
        };

        let vector = settle(NODE, ToolName::Embedder, state, invocation)?;
        if vector.is_empty() {
            return Err(NodeError::from_tool(
                ToolName::Embedder,
                ToolError::malformed(ToolName::Embedder.as_str(), "empty embedding"),
                Vec::new(),
                0,
            ));
        }

        debug!(session_id = %state.session_id, dimensions = vector.len(), "Question embedded");
        state.query_vector = Some(vector);
        Ok(NODE.default_next())
    }

    async fn search_vector(
        &self,
        node: NodeName,
        state: &WorkflowState,
        vector: &[f32],
        collection_filter: Option<&str>,
        retry_budget: u32,
    ) -> ToolInvocation<Vec<Chunk>> {
        let store = self.collaborators.store.as_ref();
        let top_k = self.workflow.top_k;

        debug!(
            session_id = %state.session_id,
            node = %node,
            collection = ?collection_filter,
            top_k,
            "Vector search"
        );

        self.tools
            .invoke(
                ToolName::VectorSearch,
                json!({
                    "top_k": top_k,
                    "collection_filter": collection_filter,
                    "dimensions": vector.len(),
                }),
                retry_budget,
                move || store.query(vector, top_k, collection_filter),
            )
            .await
    }

    async fn search_keyword(&self, question: &str, retry_budget: u32) -> ToolInvocation<Vec<Chunk>> {
        let store = self.collaborators.store.as_ref();
        let top_k = self.workflow.top_k;

        self.tools
            .invoke(
                ToolName::KeywordSearch,
                json!({ "query": question, "top_k": top_k }),
                retry_budget,
                move || store.keyword_search(question, top_k),
            )
            .await
    }

    /// Primary vector search.
    ///
    /// When routing already failed over to hybrid search, the search is
    /// handed to `hybrid_merge` instead.
    async fn retrieve(&self, state: &mut WorkflowState) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::Retrieve;

        if state.fallback_triggered() && state.search_strategy() == SearchStrategy::Hybrid {
            state.push_event(
                NODE,
                LogEvent::info(EventKind::NodeCompleted, "routing failed; using hybrid search"),
            );
            return Ok(Some(NodeName::HybridMerge));
        }

        let invocation = {
            let Some(vector) = state.query_vector.as_deref() else {
                return Err(NodeError::validation("no query vector to search with"));
            };
            self.search_vector(NODE, state, vector, state.collection_filter(), self.budget(state))
                .await
        };

        let chunks = settle(NODE, ToolName::VectorSearch, state, invocation)?;
        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::NodeCompleted,
                format!("retrieved {} chunks ({})", chunks.len(), state.search_strategy()),
            ),
        );
        state.candidate_chunks = chunks;

        Ok(NODE.default_next())
    }

    /// Decide whether to broaden the search.
    ///
    /// Broadening happens at most once; a poor result after it is accepted.
    fn evaluate_quality(&self, state: &mut WorkflowState) -> Option<NodeName> {
        const NODE: NodeName = NodeName::EvaluateQuality;

        let assessment = self.quality.evaluate(&state.candidate_chunks);
        let summary = assessment.summary();
        let needs_fallback = assessment.needs_fallback;
        state.quality = Some(assessment);

        if !needs_fallback {
            state.push_event(NODE, LogEvent::info(EventKind::Quality, summary));
            return NODE.default_next();
        }

        let strategy = state.broadening_strategy();
        if state.trigger_fallback(strategy) {
            info!(
                session_id = %state.session_id,
                strategy = %strategy,
                "Retrieval insufficient, broadening search: {}",
                summary
            );
            state.push_event(
                NODE,
                LogEvent::warning(
                    EventKind::Fallback,
                    format!("{}; broadening search ({})", summary, strategy),
                ),
            );
            return Some(broadening_node(state));
        }

        state.push_event(
            NODE,
            LogEvent::warning(
                EventKind::Quality,
                format!("{}; already broadened, accepting results", summary),
            ),
        );
        NODE.default_next()
    }

    /// Search across every category and add the hits to the candidates.
    ///
    /// Without a query vector the search is keyword based.
    async fn fallback_retrieve(
        &self,
        state: &mut WorkflowState,
    ) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::FallbackRetrieve;

        let budget = self.budget(state);
        let (tool, invocation) = match state.query_vector.as_deref() {
            Some(vector) => (
                ToolName::VectorSearch,
                self.search_vector(NODE, state, vector, None, budget).await,
            ),
            None => (
                ToolName::KeywordSearch,
                self.search_keyword(&state.question, budget).await,
            ),
        };

        let chunks = settle(NODE, tool, state, invocation)?;
        state.escalate_strategy(SearchStrategy::Fallback);
        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::Fallback,
                format!("fallback {} returned {} chunks", tool, chunks.len()),
            ),
        );
        state.candidate_chunks.extend(chunks);

        Ok(NODE.default_next())
    }

    /// Vector and keyword search issued concurrently, then fused.
    ///
    /// One side failing is tolerated. The remaining retry budget is split
    /// between the two sides, the vector side taking the odd retry, so the
    /// pair never spends more than what is left.
    async fn hybrid_merge(&self, state: &mut WorkflowState) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::HybridMerge;

        let (vector_budget, keyword_budget) =
            split_budget(self.budget(state), state.query_vector.is_some());
        let (vector_invocation, keyword_invocation) = {
            let snapshot: &WorkflowState = state;
            let vector_search = async {
                match snapshot.query_vector.as_deref() {
                    Some(vector) => Some(
                        self.search_vector(NODE, snapshot, vector, None, vector_budget)
                            .await,
                    ),
                    None => None,
                }
            };
            futures::join!(
                vector_search,
                self.search_keyword(&snapshot.question, keyword_budget)
            )
        };

        let vector_failed = vector_invocation
            .as_ref()
            .map_or(true, |invocation| !invocation.is_success());

        if vector_failed && !keyword_invocation.is_success() {
            let mut records = Vec::new();
            let mut retries = 0;
            if let Some(invocation) = vector_invocation {
                records.extend(invocation.records);
                retries += invocation.retries;
            }
            records.extend(keyword_invocation.records);
            retries += keyword_invocation.retries;
            let error = keyword_invocation.result.err().unwrap_or_else(|| {
                ToolError::unavailable(ToolName::KeywordSearch.as_str(), "no result")
            });
            return Err(NodeError::from_tool(
                ToolName::KeywordSearch,
                error,
                records,
                retries,
            ));
        }

        let vector_chunks = match vector_invocation.map(|i| absorb(NODE, state, i)) {
            Some(Ok(chunks)) => chunks,
            Some(Err(e)) => {
                state.record_recovery(
                    NODE,
                    format!(
                        "vector search failed during hybrid search ({}); using keyword results",
                        e.kind
                    ),
                );
                Vec::new()
            }
            None => Vec::new(),
        };

        let keyword_chunks = match absorb(NODE, state, keyword_invocation) {
            Ok(chunks) => chunks,
            Err(e) => {
                state.record_recovery(
                    NODE,
                    format!(
                        "keyword search failed during hybrid search ({}); using vector results",
                        e.kind
                    ),
                );
                Vec::new()
            }
        };

        let (vector_count, keyword_count) = (vector_chunks.len(), keyword_chunks.len());
        let fused = fuse(vector_chunks, keyword_chunks, &self.hybrid, self.workflow.top_k);

        state.escalate_strategy(SearchStrategy::Hybrid);
        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::Fallback,
                format!(
                    "hybrid search fused {} vector and {} keyword hits into {} chunks",
                    vector_count,
                    keyword_count,
                    fused.len()
                ),
            ),
        );
        state.candidate_chunks.extend(fused);

        Ok(NODE.default_next())
    }

    fn deduplicate(&self, state: &mut WorkflowState) -> Option<NodeName> {
        const NODE: NodeName = NodeName::Deduplicate;

        let (unique, stats) = deduplicate(std::mem::take(&mut state.candidate_chunks));
        info!(
            session_id = %state.session_id,
            original_count = stats.original_count,
            final_count = stats.final_count,
            removed_count = stats.removed_count,
            "Candidates deduplicated"
        );
        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::Deduplication,
                format!(
                    "deduplicated {} chunks to {} (removed {})",
                    stats.original_count, stats.final_count, stats.removed_count
                ),
            ),
        );
        state.candidate_chunks = unique;
        state.dedup_stats = Some(stats);

        NODE.default_next()
    }

    /// Best effort: any judge problem keeps retrieval order
    async fn rerank(&self, state: &mut WorkflowState) -> Option<NodeName> {
        const NODE: NodeName = NodeName::Rerank;

        if state.candidate_chunks.len() < 2 {
            debug!(session_id = %state.session_id, "Nothing to rerank");
            return NODE.default_next();
        }

        let invocation = {
            let judge = self.collaborators.judge.as_ref();
            let question = state.question.as_str();
            let chunks = state.candidate_chunks.as_slice();
            self.tools
                .invoke(
                    ToolName::RelevanceJudge,
                    json!({ "question": question, "chunk_ids": chunk_ids(chunks) }),
                    self.budget(state),
                    move || judge.judge(question, chunks),
                )
                .await
        };

        let chunks = std::mem::take(&mut state.candidate_chunks);
        let outcome = match absorb(NODE, state, invocation) {
            Ok(raw) => rerank(chunks, &raw),
            Err(e) => keep_order(chunks, &e),
        };

        match outcome.fallback_reason {
            Some(ref reason) => {
                warn!(session_id = %state.session_id, "Rerank skipped: {}", reason);
                state.record_recovery(
                    NODE,
                    format!("rerank skipped, kept retrieval order: {}", reason),
                );
            }
            None => state.push_event(
                NODE,
                LogEvent::info(
                    EventKind::Rerank,
                    format!("reranked {} chunks", outcome.chunks.len()),
                ),
            ),
        }
        state.candidate_chunks = outcome.chunks;

        NODE.default_next()
    }

    async fn generate_answer(
        &self,
        state: &mut WorkflowState,
    ) -> Result<Option<NodeName>, NodeError> {
        const NODE: NodeName = NodeName::GenerateAnswer;

        let context_len = state.candidate_chunks.len().min(self.workflow.max_context_chunks);
        if context_len == 0 {
            state.push_event(
                NODE,
                LogEvent::warning(EventKind::NodeCompleted, "no context chunks; skipping generation"),
            );
            return Ok(NODE.default_next());
        }

        let invocation = {
            let generator = self.collaborators.generator.as_ref();
            let question = state.question.as_str();
            let context = &state.candidate_chunks[..context_len];
            let category = state.routed_category.as_deref();
            self.tools
                .invoke(
                    ToolName::AnswerGenerator,
                    json!({
                        "question": question,
                        "chunk_ids": chunk_ids(context),
                        "category": category,
                    }),
                    self.budget(state),
                    move || generator.generate(question, context, category),
                )
                .await
        };

        let answer = settle(NODE, ToolName::AnswerGenerator, state, invocation)?;
        let citations = answer.resolve_citations(&state.candidate_chunks[..context_len]);

        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::NodeCompleted,
                format!("answer generated with {} citations", citations.len()),
            ),
        );
        state.final_answer = answer.text;
        state.citations = citations;

        Ok(NODE.default_next())
    }

    /// Terminal node; never fails
    fn format_response(&self, state: &mut WorkflowState) -> Option<NodeName> {
        const NODE: NodeName = NodeName::FormatResponse;

        if state.rejected {
            state.final_answer = format!(
                "I'm sorry, I couldn't process your question: {}.",
                state.errors.join("; ")
            );
            state.citations.clear();
        } else if state.final_answer.trim().is_empty() {
            state.final_answer = NO_ANSWER_MESSAGE.to_string();
            state.citations.clear();
        } else {
            state.final_answer = state.final_answer.trim().to_string();
        }

        let status = WorkflowStatus::of(state);
        state.push_event(
            NODE,
            LogEvent::info(
                EventKind::Completed,
                format!(
                    "workflow {} in {}ms ({} citations)",
                    status,
                    state.elapsed_ms(),
                    state.citations.len()
                ),
            ),
        );

        None
    }
}

/// Broadening node selected by the execution's hybrid switch
pub fn broadening_node(state: &WorkflowState) -> NodeName {
    if state.hybrid_enabled {
        NodeName::HybridMerge
    } else {
        NodeName::FallbackRetrieve
    }
}
