//! The statically declared node graph

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named nodes of the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Validate,
    RouteCategory,
    Embed,
    Retrieve,
    EvaluateQuality,
    FallbackRetrieve,
    HybridMerge,
    Deduplicate,
    Rerank,
    GenerateAnswer,
    FormatResponse,
}

impl NodeName {
    pub const ALL: [NodeName; 11] = [
        NodeName::Validate,
        NodeName::RouteCategory,
        NodeName::Embed,
        NodeName::Retrieve,
        NodeName::EvaluateQuality,
        NodeName::FallbackRetrieve,
        NodeName::HybridMerge,
        NodeName::Deduplicate,
        NodeName::Rerank,
        NodeName::GenerateAnswer,
        NodeName::FormatResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Validate => "validate",
            NodeName::RouteCategory => "route_category",
            NodeName::Embed => "embed",
            NodeName::Retrieve => "retrieve",
            NodeName::EvaluateQuality => "evaluate_quality",
            NodeName::FallbackRetrieve => "fallback_retrieve",
            NodeName::HybridMerge => "hybrid_merge",
            NodeName::Deduplicate => "deduplicate",
            NodeName::Rerank => "rerank",
            NodeName::GenerateAnswer => "generate_answer",
            NodeName::FormatResponse => "format_response",
        }
    }

    /// The formatting node always runs and is never counted against the
    /// iteration ceiling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeName::FormatResponse)
    }

    /// Successor on the happy path.
    ///
    /// `evaluate_quality` branches at runtime, and `format_response` has no
    /// successor.
    pub fn default_next(&self) -> Option<NodeName> {
        match self {
            NodeName::Validate => Some(NodeName::RouteCategory),
            NodeName::RouteCategory => Some(NodeName::Embed),
            NodeName::Embed => Some(NodeName::Retrieve),
            NodeName::Retrieve => Some(NodeName::EvaluateQuality),
            NodeName::EvaluateQuality => Some(NodeName::Deduplicate),
            NodeName::FallbackRetrieve | NodeName::HybridMerge => Some(NodeName::EvaluateQuality),
            NodeName::Deduplicate => Some(NodeName::Rerank),
            NodeName::Rerank => Some(NodeName::GenerateAnswer),
            NodeName::GenerateAnswer => Some(NodeName::FormatResponse),
            NodeName::FormatResponse => None,
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NodeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeName::ALL
            .iter()
            .find(|n| n.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown node '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_reaches_format() {
        let mut node = NodeName::Validate;
        let mut visited = vec![node];
        while let Some(next) = node.default_next() {
            node = next;
            visited.push(node);
        }

        assert_eq!(node, NodeName::FormatResponse);
        assert_eq!(visited.len(), 9);
        assert!(!visited.contains(&NodeName::FallbackRetrieve));
    }

    #[test]
    fn test_broadening_nodes_loop_back() {
        assert_eq!(
            NodeName::FallbackRetrieve.default_next(),
            Some(NodeName::EvaluateQuality)
        );
        assert_eq!(
            NodeName::HybridMerge.default_next(),
            Some(NodeName::EvaluateQuality)
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for node in NodeName::ALL {
            assert_eq!(node.as_str().parse::<NodeName>().unwrap(), node);
        }
        assert!("teleport".parse::<NodeName>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&NodeName::GenerateAnswer).unwrap();
        assert_eq!(json, "\"generate_answer\"");
    }

    #[test]
    fn test_only_format_is_terminal() {
        assert_eq!(NodeName::ALL.iter().filter(|n| n.is_terminal()).count(), 1);
    }
}
