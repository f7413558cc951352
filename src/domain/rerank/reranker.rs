//! Reordering of candidate chunks by judge score

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::judgement::parse_judgement;
use crate::domain::retrieval::Chunk;

/// Metadata key recording the judge score a chunk received
pub const RERANK_SCORE_KEY: &str = "rerank_score";

/// Result of applying a judge reply to a chunk list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankOutcome {
    pub chunks: Vec<Chunk>,
    /// `false` when the reply was unusable and retrieval order was kept
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Sort by judge score (desc), then retrieval score (desc). The sort is
/// stable so fully tied chunks keep their incoming order.
pub fn apply_scores(chunks: Vec<Chunk>, scores: &HashMap<String, u8>) -> Vec<Chunk> {
    let mut ranked: Vec<(u8, Chunk)> = chunks
        .into_iter()
        .map(|c| {
            let judged = scores.get(&c.id).copied().unwrap_or(0);
            (judged, c.with_metadata(RERANK_SCORE_KEY, judged.to_string()))
        })
        .collect();

    ranked.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.score.total_cmp(&a.score)));
    ranked.into_iter().map(|(_, c)| c).collect()
}

/// Apply a raw judge reply, falling back to the incoming order when the
/// reply is malformed or incomplete.
pub fn rerank(chunks: Vec<Chunk>, raw_reply: &str) -> RerankOutcome {
    match parse_judgement(raw_reply, &chunks) {
        Ok(scores) => RerankOutcome {
            chunks: apply_scores(chunks, &scores),
            applied: true,
            fallback_reason: None,
        },
        Err(e) => keep_order(chunks, &e),
    }
}

/// Outcome used when the judge could not be consulted or its reply was unusable
pub fn keep_order(chunks: Vec<Chunk>, reason: &impl ToString) -> RerankOutcome {
    RerankOutcome {
        chunks,
        applied: false,
        fallback_reason: Some(reason.to_string()),
    }
}
