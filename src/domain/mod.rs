//! Domain layer - Core business logic and entities

pub mod checkpoint;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod observability;
pub mod quality;
pub mod rerank;
pub mod retrieval;
pub mod tool;
pub mod workflow;

pub use checkpoint::{Checkpoint, CheckpointStore, CheckpointSummary, DeleteScope};
pub use embedding::Embedder;
pub use error::DomainError;
pub use llm::{AnswerGenerator, CategoryDecision, CategoryRouter, GeneratedAnswer, RelevanceJudge};
pub use observability::{ActivityCallback, AggregatedLog, DurableLogSink, EventKind, LogEvent, Severity};
pub use quality::{QualityAssessment, QualityConfig, QualityEvaluator};
pub use retrieval::{Chunk, Citation, HybridConfig, VectorStore};
pub use tool::{RetryConfig, ToolError, ToolErrorKind, ToolExecutor, ToolName, ToolsConfig};
pub use workflow::{
    NodeName, SearchStrategy, WorkflowConfig, WorkflowError, WorkflowExecutor, WorkflowOutput,
    WorkflowRequest, WorkflowState, WorkflowStatus,
};
