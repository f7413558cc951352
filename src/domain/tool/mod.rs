//! Tool domain: registry, failure classification, and the retry executor
//!
//! Every call to an external collaborator (category router, embedder, vector
//! store, answer generator, relevance judge) goes through [`ToolExecutor`],
//! which times it, classifies failures, retries recoverable ones with
//! exponential backoff, and returns one [`ToolCallRecord`] per attempt.

mod error;
mod executor;
mod record;
mod registry;
mod retry;

pub use error::{ToolError, ToolErrorKind};
pub use executor::{ToolExecutor, ToolInvocation};
pub use record::{ToolCallRecord, ToolName};
pub use registry::{ToolRegistry, ToolSpec, ToolsConfig};
pub use retry::RetryConfig;
