//! Checkpoint domain - execution snapshots for audit and resumption

mod entity;
mod store;

pub use entity::{Checkpoint, CheckpointSummary, DeleteScope};
pub use store::{ensure_thread, CheckpointStore};

#[cfg(test)]
pub use store::MockCheckpointStore;
