//! Checkpoint store implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::CheckpointStoreFactory;
pub use in_memory::InMemoryCheckpointStore;
pub use postgres::{PostgresCheckpointConfig, PostgresCheckpointStore};
