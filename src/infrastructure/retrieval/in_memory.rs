//! In-memory vector store for development, tests and the CLI
//!
//! Similarity search is brute-force cosine over stored vectors. Keyword
//! search is BM25 over lower-cased alphanumeric terms.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::embedding::Embedder;
use crate::domain::retrieval::{Chunk, VectorStore, COLLECTION_KEY, SOURCE_URL_KEY};
use crate::domain::tool::ToolError;
use crate::domain::DomainError;

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;

/// One pre-chunked passage of a corpus file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: String,
    pub content: String,
    #[serde(alias = "doc_id")]
    pub source_document: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Precomputed vector; entries without one are embedded on indexing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CorpusEntry {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source_document: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source_document: source_document.into(),
            collection: collection.into(),
            source_url: None,
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    fn to_chunk(&self, score: f32) -> Chunk {
        let mut chunk = Chunk::new(&self.id, &self.content, &self.source_document, score)
            .with_metadata(COLLECTION_KEY, &self.collection);
        if let Some(ref url) = self.source_url {
            chunk = chunk.with_metadata(SOURCE_URL_KEY, url);
        }
        chunk
    }
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    entry: CorpusEntry,
    vector: Vec<f32>,
    term_counts: HashMap<String, u32>,
    length: usize,
}

impl IndexedEntry {
    fn new(entry: CorpusEntry, vector: Vec<f32>) -> Self {
        let terms = tokenize(&entry.content);
        let length = terms.len();
        let mut term_counts = HashMap::new();
        for term in terms {
            *term_counts.entry(term).or_insert(0) += 1;
        }

        Self {
            entry,
            vector,
            term_counts,
            length,
        }
    }
}

/// Brute-force vector store holding every entry in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    entries: Arc<RwLock<Vec<IndexedEntry>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON array of corpus entries
    pub async fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<CorpusEntry>, DomainError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read corpus {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            DomainError::configuration(format!("Invalid corpus {}: {}", path.display(), e))
        })
    }

    /// Load a corpus file and index it with `embedder`
    pub async fn from_corpus_file(
        path: impl AsRef<Path>,
        embedder: &dyn Embedder,
    ) -> Result<Self, DomainError> {
        let entries = Self::load_corpus(path).await?;
        let store = Self::new();
        store.index(entries, embedder).await?;
        Ok(store)
    }

    /// Add entries, embedding those that carry no vector.
    ///
    /// Entries replace any stored entry with the same id.
    pub async fn index(
        &self,
        entries: Vec<CorpusEntry>,
        embedder: &dyn Embedder,
    ) -> Result<usize, DomainError> {
        let mut indexed = Vec::with_capacity(entries.len());

        for mut entry in entries {
            let vector = match entry.embedding.take() {
                Some(vector) => vector,
                None => embedder.embed(&entry.content).await.map_err(|e| {
                    DomainError::internal(format!("Failed to embed {}: {}", entry.id, e))
                })?,
            };
            indexed.push(IndexedEntry::new(entry, vector));
        }

        let count = indexed.len();
        let mut stored = self.entries.write().await;
        let ids: HashSet<&str> = indexed.iter().map(|e| e.entry.id.as_str()).collect();
        stored.retain(|e| !ids.contains(e.entry.id.as_str()));
        stored.extend(indexed);

        info!(
            indexed = count,
            total = stored.len(),
            embedder = embedder.embedder_name(),
            "Corpus indexed"
        );

        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Distinct collections, sorted
    pub async fn collections(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut collections: Vec<String> = entries
            .iter()
            .map(|e| e.entry.collection.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        collections.sort();
        collections
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Cosine similarity clamped to `0.0..=1.0`; `0.0` for mismatched or zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

fn rank(mut scored: Vec<(f32, Chunk)>, top_k: usize) -> Vec<Chunk> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    scored.into_iter().take(top_k).map(|(_, c)| c).collect()
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        collection_filter: Option<&str>,
    ) -> Result<Vec<Chunk>, ToolError> {
        let entries = self.entries.read().await;

        let scored: Vec<(f32, Chunk)> = entries
            .iter()
            .filter(|e| collection_filter.is_none_or(|c| e.entry.collection == c))
            .map(|e| {
                let score = cosine_similarity(vector, &e.vector);
                (score, e.entry.to_chunk(score))
            })
            .collect();

        let results = rank(scored, top_k);
        debug!(
            collection = ?collection_filter,
            results = results.len(),
            "Vector query"
        );
        Ok(results)
    }

    async fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>, ToolError> {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        let doc_count = entries.len() as f32;
        let avg_length = entries.iter().map(|e| e.length).sum::<usize>() as f32 / doc_count;

        let idf: HashMap<&str, f32> = query_terms
            .iter()
            .map(|term| {
                let df = entries
                    .iter()
                    .filter(|e| e.term_counts.contains_key(term))
                    .count() as f32;
                let idf = ((doc_count - df + 0.5) / (df + 0.5) + 1.0).ln();
                (term.as_str(), idf)
            })
            .collect();

        let raw: Vec<(f32, &IndexedEntry)> = entries
            .iter()
            .filter_map(|e| {
                let length_norm = if avg_length > 0.0 {
                    1.0 - BM25_B + BM25_B * e.length as f32 / avg_length
                } else {
                    1.0
                };

                let score: f32 = idf
                    .iter()
                    .filter_map(|(term, idf)| {
                        e.term_counts.get(*term).map(|&tf| {
                            let tf = tf as f32;
                            idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * length_norm)
                        })
                    })
                    .sum();

                (score > 0.0).then_some((score, e))
            })
            .collect();

        let best = raw.iter().map(|(s, _)| *s).fold(0.0_f32, f32::max);
        let scored: Vec<(f32, Chunk)> = raw
            .into_iter()
            .map(|(score, e)| {
                let scaled = if best > 0.0 { score / best } else { 0.0 };
                (scaled, e.entry.to_chunk(scaled))
            })
            .collect();

        Ok(rank(scored, top_k))
    }

    fn store_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbedder;
    use std::io::Write;

    fn entry(id: &str, content: &str, collection: &str, vector: Vec<f32>) -> CorpusEntry {
        CorpusEntry::new(id, content, format!("doc-{}", id), collection).with_embedding(vector)
    }

    async fn store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .index(
                vec![
                    entry("r1", "Refunds are issued within 30 days", "billing", vec![1.0, 0.0, 0.0]),
                    entry("r2", "Refund requests need the original receipt", "billing", vec![0.8, 0.6, 0.0]),
                    entry("s1", "Shipping is free above 50 euros", "shipping", vec![0.0, 1.0, 0.0]),
                    entry("s2", "Parcels arrive in three days", "shipping", vec![-1.0, 0.0, 0.0]),
                ],
                &MockEmbedder::new(),
            )
            .await
            .unwrap();
        store
    }

    fn ids(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine_similarity() {
        let store = store().await;

        let results = store.query(&[1.0, 0.0, 0.0], 3, None).await.unwrap();

        assert_eq!(ids(&results), vec!["r1", "r2", "s1"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 0.8).abs() < 1e-6);
        assert_eq!(results[0].collection(), Some("billing"));
    }

    #[tokio::test]
    async fn test_query_clamps_negative_similarity() {
        let store = store().await;

        let results = store.query(&[1.0, 0.0, 0.0], 10, Some("shipping")).await.unwrap();

        assert_eq!(ids(&results), vec!["s1", "s2"]);
        assert!(results.iter().all(|c| c.score == 0.0));
    }

    #[tokio::test]
    async fn test_query_filters_by_collection() {
        let store = store().await;

        let results = store.query(&[0.0, 1.0, 0.0], 5, Some("billing")).await.unwrap();

        assert_eq!(ids(&results), vec!["r2", "r1"]);
    }

    #[tokio::test]
    async fn test_keyword_search_scales_best_hit_to_one() {
        let store = store().await;

        let results = store.keyword_search("refund receipt", 5).await.unwrap();

        assert_eq!(results[0].id, "r2");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results.iter().all(|c| c.score > 0.0 && c.score <= 1.0));
        assert!(!ids(&results).contains(&"s1"));
    }

    #[tokio::test]
    async fn test_keyword_search_without_matches() {
        let store = store().await;

        assert!(store.keyword_search("warranty", 5).await.unwrap().is_empty());
        assert!(InMemoryVectorStore::new()
            .keyword_search("refund", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_index_embeds_missing_vectors_and_replaces_ids() {
        let embedder = MockEmbedder::new();
        let store = InMemoryVectorStore::new();

        store
            .index(
                vec![
                    CorpusEntry::new("a", "alpha", "doc", "one"),
                    entry("b", "beta", "two", vec![1.0]),
                ],
                &embedder,
            )
            .await
            .unwrap();
        store
            .index(vec![CorpusEntry::new("a", "alpha again", "doc", "one")], &embedder)
            .await
            .unwrap();

        assert_eq!(embedder.call_count(), 2);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.collections().await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_from_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "c1", "content": "Refunds take 30 days", "doc_id": "policy", "collection": "billing",
                  "source_url": "https://example.com/refunds", "embedding": [1.0, 0.0]}},
                {{"id": "c2", "content": "Free shipping", "source_document": "shipping", "collection": "shipping",
                  "embedding": [0.0, 1.0]}}
            ]"#
        )
        .unwrap();

        let store = InMemoryVectorStore::from_corpus_file(file.path(), &MockEmbedder::new())
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results[0].id, "c1");
        assert_eq!(results[0].source_document, "policy");
        assert_eq!(results[0].source_url(), Some("https://example.com/refunds"));
    }

    #[tokio::test]
    async fn test_invalid_corpus_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = InMemoryVectorStore::load_corpus(file.path()).await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
