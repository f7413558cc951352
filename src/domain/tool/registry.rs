//! Tool registry: declared timeouts per tool

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::record::ToolName;

/// Declared properties of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: ToolName,
    pub timeout: Duration,
}

impl ToolSpec {
    pub fn new(name: ToolName, timeout: Duration) -> Self {
        Self { name, timeout }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Per-tool timeout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub category_router_timeout_ms: u64,
    pub embedder_timeout_ms: u64,
    pub vector_search_timeout_ms: u64,
    pub keyword_search_timeout_ms: u64,
    pub answer_generator_timeout_ms: u64,
    pub relevance_judge_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            category_router_timeout_ms: 10_000,
            embedder_timeout_ms: 10_000,
            vector_search_timeout_ms: 10_000,
            keyword_search_timeout_ms: 10_000,
            answer_generator_timeout_ms: 60_000,
            relevance_judge_timeout_ms: 30_000,
        }
    }
}

impl ToolsConfig {
    pub fn timeout_ms(&self, tool: ToolName) -> u64 {
        match tool {
            ToolName::CategoryRouter => self.category_router_timeout_ms,
            ToolName::Embedder => self.embedder_timeout_ms,
            ToolName::VectorSearch => self.vector_search_timeout_ms,
            ToolName::KeywordSearch => self.keyword_search_timeout_ms,
            ToolName::AnswerGenerator => self.answer_generator_timeout_ms,
            ToolName::RelevanceJudge => self.relevance_judge_timeout_ms,
        }
    }
}

/// Registry of the tools a workflow may invoke
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every known tool with the configured timeouts
    pub fn from_config(config: &ToolsConfig) -> Self {
        ToolName::ALL.iter().fold(Self::new(), |registry, tool| {
            registry.with_tool(ToolSpec::new(
                *tool,
                Duration::from_millis(config.timeout_ms(*tool)),
            ))
        })
    }

    pub fn with_tool(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name, spec);
    }

    pub fn get(&self, tool: ToolName) -> Option<&ToolSpec> {
        self.tools.get(&tool)
    }

    pub fn is_registered(&self, tool: ToolName) -> bool {
        self.tools.contains_key(&tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
