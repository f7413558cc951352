//! In-memory checkpoint store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::checkpoint::{
    ensure_thread, Checkpoint, CheckpointStore, CheckpointSummary, DeleteScope,
};
use crate::domain::DomainError;

/// Thread-safe in-memory checkpoint store
///
/// Checkpoints are kept per thread in insertion order. Data is lost when the
/// process terminates.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::storage(format!("Failed to acquire checkpoint lock: {}", e))
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), DomainError> {
        ensure_thread(thread_id, &checkpoint)?;

        let mut threads = self.threads.write().map_err(lock_error)?;
        let history = threads.entry(thread_id.to_string()).or_default();

        if history
            .iter()
            .any(|c| c.checkpoint_id == checkpoint.checkpoint_id)
        {
            return Err(DomainError::conflict(format!(
                "Checkpoint '{}' already exists",
                checkpoint.checkpoint_id
            )));
        }

        history.push(checkpoint);
        Ok(())
    }

    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>, DomainError> {
        let threads = self.threads.read().map_err(lock_error)?;

        Ok(threads.get(thread_id).and_then(|history| {
            history
                .iter()
                .find(|c| c.checkpoint_id == checkpoint_id)
                .cloned()
        }))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>, DomainError> {
        let threads = self.threads.read().map_err(lock_error)?;

        Ok(threads
            .get(thread_id)
            .map(|history| history.iter().map(Checkpoint::summary).collect())
            .unwrap_or_default())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, DomainError> {
        let threads = self.threads.read().map_err(lock_error)?;

        Ok(threads
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn delete(&self, scope: DeleteScope) -> Result<usize, DomainError> {
        let mut threads = self.threads.write().map_err(lock_error)?;

        let removed = match scope {
            DeleteScope::Thread(thread_id) => {
                threads.remove(&thread_id).map(|h| h.len()).unwrap_or(0)
            }
            DeleteScope::All => {
                let count = threads.values().map(Vec::len).sum();
                threads.clear();
                count
            }
        };

        Ok(removed)
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{NodeName, SearchStrategy, WorkflowState};

    fn checkpoint(thread_id: &str) -> Checkpoint {
        let mut state = WorkflowState::new("q", thread_id, "user", vec!["billing".to_string()]);
        state.trigger_fallback(SearchStrategy::Fallback);
        Checkpoint::capture(&state, NodeName::FormatResponse, None).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = InMemoryCheckpointStore::new();
        let cp = checkpoint("t-1");
        let expected_state = cp.restore_state().unwrap();

        store.put("t-1", cp.clone()).await.unwrap();

        let loaded = store.get("t-1", &cp.checkpoint_id).await.unwrap().unwrap();
        assert_eq!(loaded, cp);
        assert_eq!(loaded.restore_state().unwrap(), expected_state);
    }

    #[tokio::test]
    async fn test_get_is_thread_scoped() {
        let store = InMemoryCheckpointStore::new();
        let cp = checkpoint("t-1");
        store.put("t-1", cp.clone()).await.unwrap();

        assert!(store.get("t-2", &cp.checkpoint_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_is_append_only() {
        let store = InMemoryCheckpointStore::new();
        let cp = checkpoint("t-1");
        store.put("t-1", cp.clone()).await.unwrap();

        let result = store.put("t-1", cp).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_put_rejects_foreign_thread() {
        let store = InMemoryCheckpointStore::new();
        let result = store.put("t-2", checkpoint("t-1")).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_list_and_latest_follow_insertion_order() {
        let store = InMemoryCheckpointStore::new();
        let first = checkpoint("t-1");
        let second = checkpoint("t-1").with_parent(Some(first.checkpoint_id.clone()));

        store.put("t-1", first.clone()).await.unwrap();
        store.put("t-1", second.clone()).await.unwrap();

        let listed = store.list("t-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].checkpoint_id, first.checkpoint_id);
        assert_eq!(
            listed[1].parent_checkpoint_id.as_deref(),
            Some(first.checkpoint_id.as_str())
        );

        let latest = store.latest("t-1").await.unwrap().unwrap();
        assert_eq!(latest.checkpoint_id, second.checkpoint_id);
        assert!(store.latest("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_thread_leaves_others() {
        let store = InMemoryCheckpointStore::new();
        store.put("t-1", checkpoint("t-1")).await.unwrap();
        store.put("t-1", checkpoint("t-1")).await.unwrap();
        let other = checkpoint("t-2");
        store.put("t-2", other.clone()).await.unwrap();

        let removed = store.delete(DeleteScope::Thread("t-1".to_string())).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.list("t-1").await.unwrap().is_empty());
        assert!(store.get("t-2", &other.checkpoint_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let store = InMemoryCheckpointStore::new();
        store.put("t-1", checkpoint("t-1")).await.unwrap();
        store.put("t-2", checkpoint("t-2")).await.unwrap();

        assert_eq!(store.delete(DeleteScope::All).await.unwrap(), 2);
        assert_eq!(store.delete(DeleteScope::All).await.unwrap(), 0);
    }
}
