//! Hybrid vector/keyword score fusion
//!
//! 1. Min-max normalize each result set to `[0, 1]`.
//! 2. Accumulate per chunk id: `fused += vector_weight × v` for each vector
//!    hit and `fused += keyword_weight × k` for each keyword hit; a chunk
//!    absent from one set contributes `0` for that component.
//! 3. Sort by fused score (desc), then chunk id (asc).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// Metadata key recording the normalized vector component of a fused chunk
pub const VECTOR_SCORE_KEY: &str = "vector_score";

/// Metadata key recording the normalized keyword component of a fused chunk
pub const KEYWORD_SCORE_KEY: &str = "keyword_score";

/// Fusion weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub vector_weight: f32,
    pub keyword_weight: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            keyword_weight: 0.3,
        }
    }
}

/// Min-max normalize scores to `[0.0, 1.0]`.
///
/// If all scores are equal they normalize to `1.0`.
pub fn normalize_scores(chunks: &[Chunk]) -> Vec<f32> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let min = chunks.iter().map(|c| c.score).fold(f32::INFINITY, f32::min);
    let max = chunks.iter().map(|c| c.score).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    chunks
        .iter()
        .map(|c| {
            if range <= f32::EPSILON {
                1.0
            } else {
                (c.score - min) / range
            }
        })
        .collect()
}

struct Fused {
    chunk: Chunk,
    vector: f32,
    keyword: f32,
}

/// Fuse vector and keyword result sets into one ranked list of at most `top_k` chunks
pub fn fuse(
    vector_hits: Vec<Chunk>,
    keyword_hits: Vec<Chunk>,
    config: &HybridConfig,
    top_k: usize,
) -> Vec<Chunk> {
    let vector_norm = normalize_scores(&vector_hits);
    let keyword_norm = normalize_scores(&keyword_hits);

    let mut order: Vec<String> = Vec::new();
    let mut fused: HashMap<String, Fused> = HashMap::new();

    for (chunk, v) in vector_hits.into_iter().zip(vector_norm) {
        let entry = fused.entry(chunk.id.clone()).or_insert_with(|| {
            order.push(chunk.id.clone());
            Fused {
                chunk,
                vector: 0.0,
                keyword: 0.0,
            }
        });
        entry.vector += v;
    }

    for (chunk, k) in keyword_hits.into_iter().zip(keyword_norm) {
        let entry = fused.entry(chunk.id.clone()).or_insert_with(|| {
            order.push(chunk.id.clone());
            Fused {
                chunk,
                vector: 0.0,
                keyword: 0.0,
            }
        });
        entry.keyword += k;
    }

    let mut results: Vec<Chunk> = order
        .iter()
        .filter_map(|id| fused.remove(id))
        .map(|f| {
            let score = config.vector_weight * f.vector + config.keyword_weight * f.keyword;
            f.chunk
                .with_score(score)
                .with_metadata(VECTOR_SCORE_KEY, format!("{:.4}", f.vector))
                .with_metadata(KEYWORD_SCORE_KEY, format!("{:.4}", f.keyword))
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    results.truncate(top_k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, score: f32) -> Chunk {
        Chunk::new(id, format!("content {}", id), "doc", score)
    }

    #[test]
    fn test_normalize_range() {
        let norm = normalize_scores(&[chunk("a", 0.2), chunk("b", 0.6), chunk("c", 1.0)]);
        assert!((norm[0] - 0.0).abs() < 1e-6);
        assert!((norm[1] - 0.5).abs() < 1e-6);
        assert!((norm[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_all_equal_and_empty() {
        assert_eq!(normalize_scores(&[chunk("a", 0.3), chunk("b", 0.3)]), vec![1.0, 1.0]);
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_chunk_in_both_sets_outranks_single_set() {
        let vector = vec![chunk("both", 0.9), chunk("vec-only", 0.9), chunk("low", 0.1)];
        let keyword = vec![chunk("both", 1.0), chunk("kw-only", 1.0), chunk("kw-low", 0.2)];

        let fused = fuse(vector, keyword, &HybridConfig::default(), 10);

        assert_eq!(fused[0].id, "both");
        assert!((fused[0].score - 1.0).abs() < 1e-5);

        let vec_only = fused.iter().find(|c| c.id == "vec-only").unwrap();
        let kw_only = fused.iter().find(|c| c.id == "kw-only").unwrap();
        assert!((vec_only.score - 0.7).abs() < 1e-5);
        assert!((kw_only.score - 0.3).abs() < 1e-5);
        assert_eq!(kw_only.metadata.get(VECTOR_SCORE_KEY).unwrap(), "0.0000");
    }

    #[test]
    fn test_fusion_respects_top_k_and_order() {
        let vector = vec![chunk("a", 0.9), chunk("b", 0.5), chunk("c", 0.1)];
        let keyword = vec![chunk("c", 0.9), chunk("d", 0.1)];

        let fused = fuse(vector, keyword, &HybridConfig::default(), 2);

        assert_eq!(fused.len(), 2);
        assert!(fused[0].score >= fused[1].score);
        assert!(fused.iter().all(|c| (0.0..=1.0).contains(&c.score)));
    }

    #[test]
    fn test_single_sided_fusion() {
        let fused = fuse(Vec::new(), vec![chunk("k", 0.4)], &HybridConfig::default(), 5);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.3).abs() < 1e-5);
    }
}
