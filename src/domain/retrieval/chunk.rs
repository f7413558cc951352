//! Retrieved chunk and citation types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding a browsable URL for the source document
pub const SOURCE_URL_KEY: &str = "source_url";

/// Metadata key holding the collection (category) a chunk was indexed under
pub const COLLECTION_KEY: &str = "collection";

/// A retrieved unit of source text with a relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier of the chunk
    pub id: String,
    /// Chunk text
    pub content: String,
    /// Identifier of the document the chunk was cut from
    pub source_document: String,
    /// Relevance score (0.0 - 1.0, higher is more relevant)
    pub score: f32,
    /// Free-form metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Create a new chunk; the score is clamped into `0.0..=1.0`
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source_document: impl Into<String>,
        score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source_document: source_document.into(),
            score: clamp_score(score),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = clamp_score(score);
        self
    }

    pub fn source_url(&self) -> Option<&str> {
        self.metadata.get(SOURCE_URL_KEY).map(String::as_str)
    }

    pub fn collection(&self) -> Option<&str> {
        self.metadata.get(COLLECTION_KEY).map(String::as_str)
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// A reference from the final answer back to a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub chunk_id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl From<&Chunk> for Citation {
    fn from(chunk: &Chunk) -> Self {
        Self {
            doc_id: chunk.source_document.clone(),
            chunk_id: chunk.id.clone(),
            score: chunk.score,
            source_url: chunk.source_url().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_score_is_clamped() {
        assert_eq!(Chunk::new("c1", "text", "doc", 1.7).score, 1.0);
        assert_eq!(Chunk::new("c1", "text", "doc", -0.2).score, 0.0);
        assert_eq!(Chunk::new("c1", "text", "doc", f32::NAN).score, 0.0);
    }

    #[test]
    fn test_citation_from_chunk() {
        let chunk = Chunk::new("c1", "Refunds within 30 days", "policy.pdf", 0.8)
            .with_metadata(SOURCE_URL_KEY, "https://example.com/policy.pdf");

        let citation = Citation::from(&chunk);

        assert_eq!(citation.doc_id, "policy.pdf");
        assert_eq!(citation.chunk_id, "c1");
        assert_eq!(citation.source_url.as_deref(), Some("https://example.com/policy.pdf"));
    }

    #[test]
    fn test_chunk_serialization_skips_empty_metadata() {
        let chunk = Chunk::new("c1", "text", "doc", 0.5);
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("metadata"));

        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
