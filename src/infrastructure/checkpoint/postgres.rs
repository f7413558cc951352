//! PostgreSQL checkpoint store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::checkpoint::{
    ensure_thread, Checkpoint, CheckpointStore, CheckpointSummary, DeleteScope,
};
use crate::domain::workflow::NodeName;
use crate::domain::DomainError;

static TABLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").unwrap());

/// PostgreSQL connection settings
#[derive(Debug, Clone)]
pub struct PostgresCheckpointConfig {
    pub url: String,
    pub table: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for PostgresCheckpointConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/rag_orchestrator".to_string(),
            table: "workflow_checkpoints".to_string(),
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

impl PostgresCheckpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

/// Checkpoints in a table keyed by `(thread_id, checkpoint_id)`, snapshot as JSONB
#[derive(Debug)]
pub struct PostgresCheckpointStore {
    pool: PgPool,
    table: String,
}

impl PostgresCheckpointStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, DomainError> {
        let table = table.into();
        if !TABLE_NAME_PATTERN.is_match(&table) {
            return Err(DomainError::configuration(format!(
                "Invalid checkpoint table name '{}'",
                table
            )));
        }
        Ok(Self { pool, table })
    }

    pub async fn connect(config: &PostgresCheckpointConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Self::new(pool, config.table.clone())
    }

    /// Creates the checkpoint table and its thread index if missing
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                thread_id VARCHAR(255) NOT NULL,
                checkpoint_id VARCHAR(255) NOT NULL,
                parent_checkpoint_id VARCHAR(255),
                node VARCHAR(64) NOT NULL,
                next_node VARCHAR(64),
                snapshot JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (thread_id, checkpoint_id)
            )
            "#,
            table = self.table
        );
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_thread_idx ON {table} (thread_id, created_at)",
            table = self.table
        );

        for query in [create, index] {
            sqlx::query(&query)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;
        }

        Ok(())
    }

    fn summary_from_row(row: &PgRow) -> Result<CheckpointSummary, DomainError> {
        Ok(CheckpointSummary {
            checkpoint_id: row.get("checkpoint_id"),
            thread_id: row.get("thread_id"),
            parent_checkpoint_id: row.get("parent_checkpoint_id"),
            node: parse_node(row.get("node"))?,
            next_node: row
                .get::<Option<String>, _>("next_node")
                .map(|n| parse_node(&n))
                .transpose()?,
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
    }

    fn checkpoint_from_row(row: &PgRow) -> Result<Checkpoint, DomainError> {
        let summary = Self::summary_from_row(row)?;

        Ok(Checkpoint {
            checkpoint_id: summary.checkpoint_id,
            thread_id: summary.thread_id,
            parent_checkpoint_id: summary.parent_checkpoint_id,
            node: summary.node,
            next_node: summary.next_node,
            state_snapshot: row.get("snapshot"),
            created_at: summary.created_at,
        })
    }
}

fn parse_node(value: &str) -> Result<NodeName, DomainError> {
    value
        .parse()
        .map_err(|e: String| DomainError::storage(format!("Corrupt checkpoint row: {}", e)))
}

const COLUMNS: &str =
    "thread_id, checkpoint_id, parent_checkpoint_id, node, next_node, snapshot, created_at";

#[async_trait]
impl CheckpointStore for PostgresCheckpointStore {
    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), DomainError> {
        ensure_thread(thread_id, &checkpoint)?;

        let query = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table, COLUMNS
        );

        sqlx::query(&query)
            .bind(thread_id)
            .bind(&checkpoint.checkpoint_id)
            .bind(&checkpoint.parent_checkpoint_id)
            .bind(checkpoint.node.as_str())
            .bind(checkpoint.next_node.map(|n| n.as_str()))
            .bind(&checkpoint.state_snapshot)
            .bind(checkpoint.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("duplicate key") {
                    DomainError::conflict(format!(
                        "Checkpoint '{}' already exists",
                        checkpoint.checkpoint_id
                    ))
                } else {
                    DomainError::storage(format!("Failed to store checkpoint: {}", e))
                }
            })?;

        debug!(thread_id, checkpoint_id = %checkpoint.checkpoint_id, "Checkpoint stored");
        Ok(())
    }

    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<Option<Checkpoint>, DomainError> {
        let query = format!(
            "SELECT {} FROM {} WHERE thread_id = $1 AND checkpoint_id = $2",
            COLUMNS, self.table
        );

        let row = sqlx::query(&query)
            .bind(thread_id)
            .bind(checkpoint_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get checkpoint: {}", e)))?;

        row.as_ref().map(Self::checkpoint_from_row).transpose()
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>, DomainError> {
        let query = format!(
            "SELECT thread_id, checkpoint_id, parent_checkpoint_id, node, next_node, created_at \
             FROM {} WHERE thread_id = $1 ORDER BY created_at, checkpoint_id",
            self.table
        );

        let rows = sqlx::query(&query)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list checkpoints: {}", e)))?;

        rows.iter().map(Self::summary_from_row).collect()
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, DomainError> {
        let query = format!(
            "SELECT {} FROM {} WHERE thread_id = $1 ORDER BY created_at DESC LIMIT 1",
            COLUMNS, self.table
        );

        let row = sqlx::query(&query)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get latest checkpoint: {}", e)))?;

        row.as_ref().map(Self::checkpoint_from_row).transpose()
    }

    async fn delete(&self, scope: DeleteScope) -> Result<usize, DomainError> {
        let result = match scope {
            DeleteScope::Thread(thread_id) => {
                let query = format!("DELETE FROM {} WHERE thread_id = $1", self.table);
                sqlx::query(&query)
                    .bind(thread_id)
                    .execute(&self.pool)
                    .await
            }
            DeleteScope::All => {
                let query = format!("DELETE FROM {}", self.table);
                sqlx::query(&query).execute(&self.pool).await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to delete checkpoints: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    fn store_name(&self) -> &'static str {
        "postgres"
    }
}
