//! Ask command - answers one question against a corpus

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;
use uuid::Uuid;

use super::progress::StderrProgress;
use super::{bootstrap, print_output, LOG_FLUSH_TIMEOUT};
use crate::domain::{NodeName, WorkflowRequest};

/// Arguments for the ask command
#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Question to answer
    #[arg(long)]
    pub question: String,

    /// Session id, also the checkpoint thread id (generated when omitted)
    #[arg(long)]
    pub session: Option<String>,

    /// User the question is asked for
    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Category the router may pick; repeatable. Defaults to every corpus collection
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Pre-chunked JSON corpus
    #[arg(long)]
    pub corpus: PathBuf,

    /// Merge vector and keyword results instead of a keyword-only broadening
    #[arg(long)]
    pub hybrid: bool,

    /// Stop and checkpoint once this node has committed
    #[arg(long)]
    pub pause_after: Option<NodeName>,
}

impl AskArgs {
    pub fn into_request(self) -> WorkflowRequest {
        let session = self
            .session
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut request = WorkflowRequest::new(self.question, session, self.user)
            .with_categories(self.categories);

        if self.hybrid {
            request = request.with_hybrid(true);
        }
        if let Some(node) = self.pause_after {
            request = request.with_pause_after(node);
        }
        request
    }
}

/// Run the ask command
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = bootstrap();

    let orchestrator =
        crate::create_orchestrator(&config, &args.corpus, Arc::new(StderrProgress)).await?;

    let request = args.into_request();
    info!(session_id = %request.session_id, "Answering question");

    let output = orchestrator.ask(request).await?;
    print_output(&output)?;

    orchestrator.flush_logs(LOG_FLUSH_TIMEOUT).await;
    Ok(())
}
