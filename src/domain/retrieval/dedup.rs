//! Content-hash deduplication of candidate chunks

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::chunk::Chunk;

/// Counts reported by a deduplication pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub original_count: usize,
    pub final_count: usize,
    pub removed_count: usize,
}

/// Hash of the chunk text after collapsing whitespace and case-folding
pub fn content_hash(content: &str) -> String {
    let normalized = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Remove chunks whose normalized content was already seen.
///
/// Chunks are visited in descending score order (ties keep input order) and
/// the first occurrence of each content hash survives, so the output is
/// ordered highest score first.
pub fn deduplicate(chunks: Vec<Chunk>) -> (Vec<Chunk>, DedupStats) {
    let original_count = chunks.len();

    let mut ordered = chunks;
    ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen = HashSet::with_capacity(ordered.len());
    let survivors: Vec<Chunk> = ordered
        .into_iter()
        .filter(|chunk| seen.insert(content_hash(&chunk.content)))
        .collect();

    let final_count = survivors.len();

    (
        survivors,
        DedupStats {
            original_count,
            final_count,
            removed_count: original_count - final_count,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str, score: f32) -> Chunk {
        Chunk::new(id, content, "doc", score)
    }

    #[test]
    fn test_hash_normalizes_whitespace_and_case() {
        assert_eq!(
            content_hash("Refund  policy:\n 30 days"),
            content_hash("refund policy: 30 DAYS")
        );
        assert_ne!(content_hash("refund policy"), content_hash("refund policies"));
    }

    #[test]
    fn test_keeps_highest_scored_duplicate() {
        let chunks = vec![
            chunk("primary", "Refunds within 30 days", 0.4),
            chunk("other", "Shipping is free", 0.6),
            chunk("fallback", "refunds   within 30 DAYS", 0.9),
        ];

        let (survivors, stats) = deduplicate(chunks);

        let ids: Vec<_> = survivors.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["fallback", "other"]);
        assert_eq!(
            stats,
            DedupStats {
                original_count: 3,
                final_count: 2,
                removed_count: 1
            }
        );
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let chunks = vec![
            chunk("first", "same text", 0.5),
            chunk("second", "Same Text", 0.5),
        ];

        let (survivors, _) = deduplicate(chunks);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id, "first");
    }

    #[test]
    fn test_output_is_unique_and_descending() {
        let contents = ["a b", "A  b", "c", "d", "C", "e f", "E F", "g"];
        let chunks: Vec<Chunk> = contents
            .iter()
            .enumerate()
            .map(|(i, text)| chunk(&format!("c{}", i), text, ((i * 37) % 10) as f32 / 10.0))
            .collect();

        let (survivors, stats) = deduplicate(chunks.clone());

        let hashes: HashSet<_> = survivors.iter().map(|c| content_hash(&c.content)).collect();
        assert_eq!(hashes.len(), survivors.len());
        assert!(survivors.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(survivors.iter().all(|s| chunks.contains(s)));
        assert_eq!(stats.final_count + stats.removed_count, chunks.len());
    }

    #[test]
    fn test_empty_input() {
        let (survivors, stats) = deduplicate(Vec::new());
        assert!(survivors.is_empty());
        assert_eq!(stats.removed_count, 0);
    }
}
