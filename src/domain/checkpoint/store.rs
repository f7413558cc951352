//! Checkpoint store trait

use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{Checkpoint, CheckpointSummary, DeleteScope};
use crate::domain::DomainError;

/// Append-only checkpoint storage partitioned by thread id
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CheckpointStore: Send + Sync + Debug {
    /// Store a checkpoint under `thread_id`.
    ///
    /// Fails with `Conflict` when the checkpoint id already exists and with
    /// `Validation` when the checkpoint belongs to another thread.
    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), DomainError>;

    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>, DomainError>;

    /// Checkpoints of a thread, oldest first
    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>, DomainError>;

    /// Most recent checkpoint of a thread
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, DomainError>;

    /// Remove checkpoints, returning how many were removed
    async fn delete(&self, scope: DeleteScope) -> Result<usize, DomainError>;

    fn store_name(&self) -> &'static str;
}

/// Reject a checkpoint filed under a thread it was not taken for
pub fn ensure_thread(thread_id: &str, checkpoint: &Checkpoint) -> Result<(), DomainError> {
    if checkpoint.thread_id != thread_id {
        return Err(DomainError::validation(format!(
            "checkpoint {} belongs to thread '{}', not '{}'",
            checkpoint.checkpoint_id, checkpoint.thread_id, thread_id
        )));
    }
    Ok(())
}
