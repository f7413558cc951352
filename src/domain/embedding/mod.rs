//! Embedding domain module

mod provider;

pub use provider::Embedder;

#[cfg(test)]
pub use provider::mock::{letter_vector, MockEmbedder};
