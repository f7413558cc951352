//! Resume command - continues an execution from a checkpoint

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use super::progress::StderrProgress;
use super::{bootstrap, print_output, LOG_FLUSH_TIMEOUT};

/// Arguments for the resume command
#[derive(Args, Debug, Clone)]
pub struct ResumeArgs {
    /// Thread (session) id the checkpoint belongs to
    #[arg(long)]
    pub thread: String,

    /// Checkpoint to resume from; the thread's latest when omitted
    #[arg(long)]
    pub checkpoint: Option<String>,

    /// Pre-chunked JSON corpus
    #[arg(long)]
    pub corpus: PathBuf,
}

/// Run the resume command
pub async fn run(args: ResumeArgs) -> anyhow::Result<()> {
    let config = bootstrap();

    let orchestrator =
        crate::create_orchestrator(&config, &args.corpus, Arc::new(StderrProgress)).await?;

    let checkpoint_id = match args.checkpoint {
        Some(id) => id,
        None => orchestrator
            .checkpoints()
            .latest(&args.thread)
            .await?
            .map(|checkpoint| checkpoint.checkpoint_id)
            .ok_or_else(|| anyhow::anyhow!("No checkpoints for thread {}", args.thread))?,
    };

    info!(thread_id = %args.thread, checkpoint_id = %checkpoint_id, "Resuming");

    let output = orchestrator.resume(&args.thread, &checkpoint_id).await?;
    print_output(&output)?;

    orchestrator.flush_logs(LOG_FLUSH_TIMEOUT).await;
    Ok(())
}
