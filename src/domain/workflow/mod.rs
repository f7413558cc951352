//! Workflow domain - node graph, execution state and output contract

mod config;
mod error;
mod executor;
mod node;
mod output;
mod state;

pub use config::WorkflowConfig;
pub use error::{ErrorClass, NodeError, WorkflowError};
pub use executor::{WorkflowExecutor, WorkflowRequest};
pub use node::NodeName;
pub use output::{WorkflowLog, WorkflowOutput, WorkflowStatus};
pub use state::{SearchStrategy, WorkflowState};
