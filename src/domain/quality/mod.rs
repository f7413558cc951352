//! Retrieval quality evaluation

mod config;
mod evaluator;

pub use config::QualityConfig;
pub use evaluator::{QualityAssessment, QualityEvaluator, QualityIssue};
