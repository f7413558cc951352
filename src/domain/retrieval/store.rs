//! Vector store trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use super::chunk::Chunk;
use crate::domain::tool::ToolError;

/// Similarity and keyword search over indexed chunks
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Nearest chunks to `vector`, optionally restricted to one collection
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        collection_filter: Option<&str>,
    ) -> Result<Vec<Chunk>, ToolError>;

    /// Keyword-ranked chunks across all collections
    async fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, ToolError>;

    /// Get the store name
    fn store_name(&self) -> &'static str;
}
