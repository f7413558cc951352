//! Best-effort second-pass ranking of retrieved chunks

mod judgement;
mod reranker;

pub use judgement::{parse_judgement, JudgementError, MAX_JUDGE_SCORE, MIN_JUDGE_SCORE};
pub use reranker::{apply_scores, keep_order, rerank, RerankOutcome, RERANK_SCORE_KEY};
