//! Infrastructure layer - External service implementations

pub mod checkpoint;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod retrieval;
pub mod workflow;
