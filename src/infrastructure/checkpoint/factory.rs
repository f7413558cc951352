//! Checkpoint store selection from configuration

use std::sync::Arc;

use tracing::info;

use crate::config::{CheckpointBackend, CheckpointSettings};
use crate::domain::checkpoint::CheckpointStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryCheckpointStore;
use super::postgres::{PostgresCheckpointConfig, PostgresCheckpointStore};

/// Builds the configured checkpoint store
#[derive(Debug)]
pub struct CheckpointStoreFactory;

impl CheckpointStoreFactory {
    pub async fn create(
        settings: &CheckpointSettings,
    ) -> Result<Arc<dyn CheckpointStore>, DomainError> {
        match settings.backend {
            CheckpointBackend::Memory => {
                info!("Using in-memory checkpoint store");
                Ok(Arc::new(InMemoryCheckpointStore::new()))
            }
            CheckpointBackend::Postgres => {
                let url = settings.postgres_url.as_deref().ok_or_else(|| {
                    DomainError::configuration(
                        "checkpoint.postgres_url is required for the postgres backend",
                    )
                })?;

                let config = PostgresCheckpointConfig::new(url).with_table(settings.table.clone());
                let store = PostgresCheckpointStore::connect(&config).await?;
                store.ensure_table().await?;

                info!(table = %settings.table, "Using PostgreSQL checkpoint store");
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = CheckpointStoreFactory::create(&CheckpointSettings::default())
            .await
            .unwrap();
        assert_eq!(store.store_name(), "memory");
    }

    #[tokio::test]
    async fn test_postgres_requires_url() {
        let settings = CheckpointSettings {
            backend: CheckpointBackend::Postgres,
            postgres_url: None,
            ..CheckpointSettings::default()
        };

        let result = CheckpointStoreFactory::create(&settings).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
