//! CLI module for the RAG orchestrator
//!
//! Provides subcommands:
//! - `ask`: answer a question against a corpus
//! - `resume`: continue a paused execution from a checkpoint
//! - `checkpoints`: inspect and prune stored checkpoints

pub mod ask;
pub mod checkpoints;
pub mod progress;
pub mod resume;

use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::WorkflowOutput;
use crate::infrastructure::logging::init_logging;

/// How long a command waits for the durable log before exiting
pub(crate) const LOG_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// RAG Orchestrator - bounded retrieval-augmented answering
#[derive(Parser)]
#[command(name = "rag-orchestrator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer a question
    Ask(ask::AskArgs),

    /// Continue an execution from a stored checkpoint
    Resume(resume::ResumeArgs),

    /// Inspect or delete stored checkpoints
    Checkpoints(checkpoints::CheckpointsArgs),
}

/// Load `.env`, configuration and the tracing subscriber
pub(crate) fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);
    config
}

pub(crate) fn print_output(output: &WorkflowOutput) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeName;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "rag-orchestrator",
            "ask",
            "--question",
            "How long do refunds take?",
            "--corpus",
            "corpus.json",
            "--category",
            "billing",
            "--category",
            "shipping",
            "--pause-after",
            "evaluate_quality",
        ])
        .unwrap();

        let Command::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "How long do refunds take?");
        assert_eq!(args.categories, vec!["billing", "shipping"]);
        assert_eq!(args.pause_after, Some(NodeName::EvaluateQuality));
        assert!(!args.hybrid);
    }

    #[test]
    fn test_parse_rejects_unknown_node() {
        let result = Cli::try_parse_from([
            "rag-orchestrator",
            "ask",
            "--question",
            "q",
            "--corpus",
            "corpus.json",
            "--pause-after",
            "nowhere",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_parse_delete_requires_scope() {
        let result = Cli::try_parse_from(["rag-orchestrator", "checkpoints", "delete"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "rag-orchestrator",
            "checkpoints",
            "delete",
            "--thread",
            "t-1",
            "--all",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_resume_without_checkpoint() {
        let cli = Cli::try_parse_from([
            "rag-orchestrator",
            "resume",
            "--thread",
            "t-1",
            "--corpus",
            "corpus.json",
        ])
        .unwrap();

        let Command::Resume(args) = cli.command else {
            panic!("expected resume");
        };
        assert_eq!(args.thread, "t-1");
        assert!(args.checkpoint.is_none());
    }
}
