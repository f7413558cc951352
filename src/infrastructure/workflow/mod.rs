//! Workflow infrastructure: node implementations and the graph runner

mod executor_impl;
mod nodes;

pub use executor_impl::{WorkflowExecutorImpl, FALLBACK_AFTER_RETRIES, ITERATION_LIMIT_REACHED};
pub use nodes::{
    broadening_node, Collaborators, ExecutorSettings, WorkflowNodes, EMPTY_QUESTION,
    NO_ANSWER_MESSAGE,
};
