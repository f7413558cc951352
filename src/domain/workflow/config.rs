//! Runner configuration

use serde::{Deserialize, Serialize};

/// Limits and switches for one workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Ceiling on non-terminal node executions
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Chunks requested from each search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Chunks handed to the generator
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Longest accepted question
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,

    /// Router decisions below this confidence are ignored
    #[serde(default)]
    pub min_routing_confidence: f32,

    /// Write a checkpoint after every committed node
    #[serde(default)]
    pub checkpoint_each_node: bool,

    /// Broaden with hybrid search instead of plain fallback search
    #[serde(default)]
    pub hybrid_enabled: bool,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_top_k() -> usize {
    5
}

fn default_max_context_chunks() -> usize {
    5
}

fn default_max_question_chars() -> usize {
    4000
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            top_k: default_top_k(),
            max_context_chunks: default_max_context_chunks(),
            max_question_chars: default_max_question_chars(),
            min_routing_confidence: 0.0,
            checkpoint_each_node: false,
            hybrid_enabled: false,
        }
    }
}

impl WorkflowConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_routing_confidence(mut self, confidence: f32) -> Self {
        self.min_routing_confidence = confidence;
        self
    }

    pub fn with_checkpoint_each_node(mut self, enabled: bool) -> Self {
        self.checkpoint_each_node = enabled;
        self
    }

    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.hybrid_enabled = enabled;
        self
    }
}
