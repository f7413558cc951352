//! Embedder trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::tool::ToolError;

/// Turns text into a dense vector
#[async_trait]
pub trait Embedder: Send + Sync + Debug {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ToolError>;

    /// Get the embedder name
    fn embedder_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::tool::ToolErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Deterministic bag-of-letters embedder
    #[derive(Debug)]
    pub struct MockEmbedder {
        failures: u32,
        failure_kind: ToolErrorKind,
        calls: AtomicU32,
    }

    impl Default for MockEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockEmbedder {
        pub fn new() -> Self {
            Self {
                failures: 0,
                failure_kind: ToolErrorKind::Timeout,
                calls: AtomicU32::new(0),
            }
        }

        pub fn with_failures(mut self, failures: u32, kind: ToolErrorKind) -> Self {
            self.failures = failures;
            self.failure_kind = kind;
            self
        }

        pub fn failing(kind: ToolErrorKind) -> Self {
            Self::new().with_failures(u32::MAX, kind)
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Letter-frequency vector over a-z; similar wording yields similar vectors
    pub fn letter_vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 26];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        vector
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ToolError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if call < self.failures {
                return Err(ToolError::new(self.failure_kind, "embedder", "scripted failure"));
            }

            Ok(letter_vector(text))
        }

        fn embedder_name(&self) -> &'static str {
            "mock"
        }
    }
}
