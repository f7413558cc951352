//! Checkpoints command - lists, shows and deletes stored checkpoints

use std::sync::Arc;

use clap::{Args, Subcommand};
use tracing::info;

use super::bootstrap;
use crate::domain::{CheckpointStore, DeleteScope};

/// Arguments for the checkpoints command
#[derive(Args, Debug, Clone)]
pub struct CheckpointsArgs {
    #[command(subcommand)]
    pub action: CheckpointAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CheckpointAction {
    /// List the checkpoints of a thread, oldest first
    List {
        #[arg(long)]
        thread: String,
    },

    /// Print one checkpoint including its state snapshot
    Show {
        #[arg(long)]
        thread: String,

        #[arg(long)]
        checkpoint: String,
    },

    /// Delete the checkpoints of one thread or of every thread
    Delete {
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        thread: Option<String>,

        #[arg(long)]
        all: bool,
    },
}

impl CheckpointAction {
    fn delete_scope(thread: Option<String>, all: bool) -> anyhow::Result<DeleteScope> {
        match (thread, all) {
            (_, true) => Ok(DeleteScope::All),
            (Some(thread), false) => Ok(DeleteScope::Thread(thread)),
            (None, false) => anyhow::bail!("either --thread or --all is required"),
        }
    }
}

/// Run the checkpoints command
pub async fn run(args: CheckpointsArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let store = crate::create_checkpoint_store(&config).await?;

    let rendered = execute(store, args.action).await?;
    println!("{}", rendered);
    Ok(())
}

/// Perform `action` against `store`, returning the JSON to print
pub async fn execute(
    store: Arc<dyn CheckpointStore>,
    action: CheckpointAction,
) -> anyhow::Result<String> {
    match action {
        CheckpointAction::List { thread } => {
            let summaries = store.list(&thread).await?;
            Ok(serde_json::to_string_pretty(&summaries)?)
        }
        CheckpointAction::Show { thread, checkpoint } => {
            let found = store
                .get(&thread, &checkpoint)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!("Checkpoint not found: {} (thread {})", checkpoint, thread)
                })?;
            Ok(serde_json::to_string_pretty(&found)?)
        }
        CheckpointAction::Delete { thread, all } => {
            let scope = CheckpointAction::delete_scope(thread, all)?;
            let removed = store.delete(scope).await?;
            info!(removed, store = store.store_name(), "Checkpoints deleted");
            Ok(serde_json::json!({ "removed": removed }).to_string())
        }
    }
}
