//! Relevance judge collaborator used by the reranker

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::retrieval::Chunk;
use crate::domain::tool::ToolError;

/// Scores every chunk against the question in a single batched call.
///
/// Returns the judge's raw reply; parsing and validation belong to the
/// reranker so a malformed reply degrades gracefully.
#[async_trait]
pub trait RelevanceJudge: Send + Sync + Debug {
    async fn judge(&self, question: &str, chunks: &[Chunk]) -> Result<String, ToolError>;
}
