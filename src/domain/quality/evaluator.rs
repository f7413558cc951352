//! Retrieval quality evaluation and the fallback decision

use serde::{Deserialize, Serialize};

use super::config::QualityConfig;
use crate::domain::retrieval::Chunk;

/// Why a result set was judged insufficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    TooFewChunks,
    LowSimilarity,
    TooFewChunksAndLowSimilarity,
}

impl QualityIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityIssue::TooFewChunks => "too few chunks",
            QualityIssue::LowSimilarity => "low average similarity",
            QualityIssue::TooFewChunksAndLowSimilarity => {
                "too few chunks and low average similarity"
            }
        }
    }
}

/// Retrieval statistics and the resulting decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub chunk_count: usize,
    pub avg_similarity: f32,
    pub needs_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<QualityIssue>,
}

impl QualityAssessment {
    pub fn summary(&self) -> String {
        match self.issue {
            Some(issue) => format!(
                "{} chunks, avg similarity {:.2}: {}",
                self.chunk_count,
                self.avg_similarity,
                issue.as_str()
            ),
            None => format!(
                "{} chunks, avg similarity {:.2}: sufficient",
                self.chunk_count, self.avg_similarity
            ),
        }
    }
}

/// Decides from retrieval statistics whether the search should be broadened
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator {
    config: QualityConfig,
}

impl QualityEvaluator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Fallback is needed when `count < min_chunks` or `mean(score) < min_avg_similarity`.
    /// An empty set has an average similarity of `0.0`.
    pub fn evaluate(&self, chunks: &[Chunk]) -> QualityAssessment {
        let chunk_count = chunks.len();
        let avg_similarity = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(|c| c.score).sum::<f32>() / chunk_count as f32
        };

        let too_few = chunk_count < self.config.min_chunks;
        let too_weak = avg_similarity < self.config.min_avg_similarity;

        let issue = match (too_few, too_weak) {
            (true, true) => Some(QualityIssue::TooFewChunksAndLowSimilarity),
            (true, false) => Some(QualityIssue::TooFewChunks),
            (false, true) => Some(QualityIssue::LowSimilarity),
            (false, false) => None,
        };

        QualityAssessment {
            chunk_count,
            avg_similarity,
            needs_fallback: issue.is_some(),
            issue,
        }
    }
}
