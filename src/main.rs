use clap::Parser;
use rag_orchestrator::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ask(args) => cli::ask::run(args).await,
        Command::Resume(args) => cli::resume::run(args).await,
        Command::Checkpoints(args) => cli::checkpoints::run(args).await,
    }
}
