//! Retrieval quality thresholds

use serde::{Deserialize, Serialize};

/// Thresholds below which retrieval results are considered insufficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Minimum number of candidate chunks
    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,
    /// Minimum mean similarity score (0.0 - 1.0)
    #[serde(default = "default_min_avg_similarity")]
    pub min_avg_similarity: f32,
}

fn default_min_chunks() -> usize {
    3
}

fn default_min_avg_similarity() -> f32 {
    0.30
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_chunks: default_min_chunks(),
            min_avg_similarity: default_min_avg_similarity(),
        }
    }
}

impl QualityConfig {
    pub fn new(min_chunks: usize, min_avg_similarity: f32) -> Self {
        Self {
            min_chunks,
            min_avg_similarity,
        }
    }
}
