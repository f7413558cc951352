//! Parsing of the relevance judge's batched reply

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::retrieval::Chunk;

/// Lowest score on the judge's ordinal scale
pub const MIN_JUDGE_SCORE: u8 = 1;

/// Highest score on the judge's ordinal scale
pub const MAX_JUDGE_SCORE: u8 = 10;

/// Why a judge reply could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JudgementError {
    #[error("judge reply contained no JSON")]
    NoJson,

    #[error("judge reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("score {score} for chunk '{id}' is outside 1-10")]
    OutOfRange { id: String, score: f64 },

    #[error("no score for chunk '{0}'")]
    MissingScore(String),
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    id: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JudgeReply {
    Wrapped { scores: Vec<ScoreEntry> },
    Bare(Vec<ScoreEntry>),
}

/// Locate the JSON payload inside a free-form reply.
///
/// Models tend to wrap JSON in prose or code fences, so take the span from
/// the first opening bracket to the last matching closing bracket.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;

    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Parse the judge reply into one score per chunk id.
///
/// Every chunk must receive a score in `1..=10`; fractional scores are rounded.
/// Scores for ids not present in `chunks` are ignored.
pub fn parse_judgement(raw: &str, chunks: &[Chunk]) -> Result<HashMap<String, u8>, JudgementError> {
    let json = extract_json(raw).ok_or(JudgementError::NoJson)?;
    let reply: JudgeReply =
        serde_json::from_str(json).map_err(|e| JudgementError::InvalidJson(e.to_string()))?;

    let entries = match reply {
        JudgeReply::Wrapped { scores } => scores,
        JudgeReply::Bare(scores) => scores,
    };

    let mut scores = HashMap::with_capacity(entries.len());
    for entry in entries {
        let rounded = entry.score.round();
        if !(f64::from(MIN_JUDGE_SCORE)..=f64::from(MAX_JUDGE_SCORE)).contains(&rounded) {
            return Err(JudgementError::OutOfRange {
                id: entry.id,
                score: entry.score,
            });
        }
        scores.insert(entry.id, rounded as u8);
    }

    if let Some(missing) = chunks.iter().find(|c| !scores.contains_key(&c.id)) {
        return Err(JudgementError::MissingScore(missing.id.clone()));
    }

    scores.retain(|id, _| chunks.iter().any(|c| &c.id == id));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("a", "alpha", "doc", 0.9),
            Chunk::new("b", "beta", "doc", 0.5),
        ]
    }

    #[test]
    fn test_parse_wrapped_reply() {
        let raw = r#"Here you go: {"scores":[{"id":"a","score":3},{"id":"b","score":9}]} done"#;
        let scores = parse_judgement(raw, &chunks()).unwrap();
        assert_eq!(scores["a"], 3);
        assert_eq!(scores["b"], 9);
    }

    #[test]
    fn test_parse_bare_array_and_rounding() {
        let raw = r#"```json
[{"id":"a","score":7.6},{"id":"b","score":2}]
```"#;
        let scores = parse_judgement(raw, &chunks()).unwrap();
        assert_eq!(scores["a"], 8);
        assert_eq!(scores["b"], 2);
    }

    #[test]
    fn test_extra_ids_are_ignored() {
        let raw = r#"{"scores":[{"id":"a","score":3},{"id":"b","score":4},{"id":"zzz","score":10}]}"#;
        let scores = parse_judgement(raw, &chunks()).unwrap();
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_missing_score_rejected() {
        let raw = r#"{"scores":[{"id":"a","score":3}]}"#;
        assert_eq!(
            parse_judgement(raw, &chunks()),
            Err(JudgementError::MissingScore("b".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let raw = r#"{"scores":[{"id":"a","score":0},{"id":"b","score":4}]}"#;
        assert!(matches!(
            parse_judgement(raw, &chunks()),
            Err(JudgementError::OutOfRange { .. })
        ));

        let raw = r#"{"scores":[{"id":"a","score":11},{"id":"b","score":4}]}"#;
        assert!(parse_judgement(raw, &chunks()).is_err());
    }

    #[test]
    fn test_non_json_rejected() {
        assert_eq!(
            parse_judgement("I think chunk a is best", &chunks()),
            Err(JudgementError::NoJson)
        );
        assert!(matches!(
            parse_judgement("{not json}", &chunks()),
            Err(JudgementError::InvalidJson(_))
        ));
    }
}
