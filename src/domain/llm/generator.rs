//! Answer generation collaborator

use std::fmt::Debug;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::retrieval::{Chunk, Citation};
use crate::domain::tool::ToolError;

/// Matches bracketed citation markers such as `[2]` or `[chunk-17]`
static MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Za-z0-9_.:#-]+)\]").unwrap());

/// Generated answer text plus the markers it cites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub text: String,
    #[serde(default)]
    pub citation_markers: Vec<String>,
}

impl GeneratedAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citation_markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: Vec<String>) -> Self {
        self.citation_markers = markers;
        self
    }

    /// Build an answer whose markers are the bracketed references in `text`
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let markers = extract_markers(&text);
        Self {
            text,
            citation_markers: markers,
        }
    }

    /// Resolve markers against the context chunks the answer was generated from.
    ///
    /// A marker is either a chunk id or a 1-based position in `context`.
    /// Unknown markers are ignored and each chunk is cited at most once. If no
    /// marker resolves, every context chunk is cited.
    pub fn resolve_citations(&self, context: &[Chunk]) -> Vec<Citation> {
        let mut cited: Vec<&Chunk> = Vec::new();

        for marker in &self.citation_markers {
            let marker = marker.trim().trim_start_matches('[').trim_end_matches(']');

            let chunk = context.iter().find(|c| c.id == marker).or_else(|| {
                marker
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n >= 1)
                    .and_then(|n| context.get(n - 1))
            });

            if let Some(chunk) = chunk {
                if !cited.iter().any(|c| c.id == chunk.id) {
                    cited.push(chunk);
                }
            }
        }

        if cited.is_empty() {
            return context.iter().map(Citation::from).collect();
        }

        cited.into_iter().map(Citation::from).collect()
    }
}

/// Extract bracketed citation markers from generated text, in order of appearance
pub fn extract_markers(text: &str) -> Vec<String> {
    let mut markers: Vec<String> = Vec::new();

    for caps in MARKER_PATTERN.captures_iter(text) {
        let marker = caps[1].to_string();
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }

    markers
}

/// Produces the final answer from the question and the selected chunks
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    async fn generate(
        &self,
        question: &str,
        chunks: &[Chunk],
        category: Option<&str>,
    ) -> Result<GeneratedAnswer, ToolError>;
}
