//! Tool names and per-attempt call records

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ToolErrorKind;

/// External tools the workflow may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CategoryRouter,
    Embedder,
    VectorSearch,
    KeywordSearch,
    AnswerGenerator,
    RelevanceJudge,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::CategoryRouter,
        ToolName::Embedder,
        ToolName::VectorSearch,
        ToolName::KeywordSearch,
        ToolName::AnswerGenerator,
        ToolName::RelevanceJudge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CategoryRouter => "category_router",
            ToolName::Embedder => "embedder",
            ToolName::VectorSearch => "vector_search",
            ToolName::KeywordSearch => "keyword_search",
            ToolName::AnswerGenerator => "answer_generator",
            ToolName::RelevanceJudge => "relevance_judge",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attempt at calling a tool. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool_name: ToolName,
    pub arguments: Value,
    /// 1-based attempt number within one invocation
    pub attempt: u32,
    pub elapsed_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ToolErrorKind>,
}

impl ToolCallRecord {
    pub fn success(tool_name: ToolName, arguments: Value, attempt: u32, elapsed_ms: u64) -> Self {
        Self {
            tool_name,
            arguments,
            attempt,
            elapsed_ms,
            success: true,
            error_type: None,
        }
    }

    pub fn failure(
        tool_name: ToolName,
        arguments: Value,
        attempt: u32,
        elapsed_ms: u64,
        error_type: ToolErrorKind,
    ) -> Self {
        Self {
            tool_name,
            arguments,
            attempt,
            elapsed_ms,
            success: false,
            error_type: Some(error_type),
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self.error_type {
            None => "success",
            Some(kind) => kind.as_str(),
        }
    }
}
