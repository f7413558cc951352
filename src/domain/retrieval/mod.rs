//! Retrieval domain: chunks, the vector store seam, deduplication, and hybrid fusion

mod chunk;
mod dedup;
mod hybrid;
mod store;

pub use chunk::{Chunk, Citation, COLLECTION_KEY, SOURCE_URL_KEY};
pub use dedup::{content_hash, deduplicate, DedupStats};
pub use hybrid::{fuse, normalize_scores, HybridConfig, KEYWORD_SCORE_KEY, VECTOR_SCORE_KEY};
pub use store::VectorStore;

#[cfg(test)]
pub use store::mock::MockVectorStore;
