//! RAG Orchestrator
//!
//! A bounded node-graph runner that answers a question by routing it to a
//! category, retrieving and grading context, broadening the search when the
//! context is weak, and generating a cited answer. Supports:
//! - Per-tool retries with a shared per-execution budget
//! - Vector, keyword and hybrid retrieval
//! - Checkpoints for pause, resume and replay
//! - Live progress notifications and a durable per-session log

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use domain::{
    ActivityCallback, CheckpointStore, DomainError, ToolName, WorkflowError, WorkflowExecutor,
    WorkflowOutput, WorkflowRequest,
};
use infrastructure::{
    checkpoint::CheckpointStoreFactory,
    llm::{HttpClient, OpenAiCompatibleClient},
    observability::{FileLogSink, ObservabilityChannel},
    retrieval::InMemoryVectorStore,
    workflow::{Collaborators, ExecutorSettings, WorkflowExecutorImpl},
};

/// Everything a caller needs to answer questions and manage checkpoints
#[derive(Debug)]
pub struct Orchestrator {
    executor: WorkflowExecutorImpl,
    checkpoints: Arc<dyn CheckpointStore>,
    store: InMemoryVectorStore,
}

impl Orchestrator {
    pub fn new(
        executor: WorkflowExecutorImpl,
        checkpoints: Arc<dyn CheckpointStore>,
        store: InMemoryVectorStore,
    ) -> Self {
        Self {
            executor,
            checkpoints,
            store,
        }
    }

    /// Answer a question.
    ///
    /// A request without categories is offered every collection in the
    /// corpus. The durable log is written in the background; see
    /// [`Orchestrator::flush_logs`].
    pub async fn ask(&self, mut request: WorkflowRequest) -> Result<WorkflowOutput, WorkflowError> {
        if request.categories.is_empty() {
            request.categories = self.store.collections().await;
        }

        self.executor.run(request).await
    }

    pub async fn resume(
        &self,
        thread_id: &str,
        checkpoint_id: &str,
    ) -> Result<WorkflowOutput, WorkflowError> {
        self.executor.resume(thread_id, checkpoint_id).await
    }

    /// Wait up to `limit` for background log writes.
    ///
    /// Returns `false` if the limit elapsed first; the writes keep running.
    pub async fn flush_logs(&self, limit: Duration) -> bool {
        match tokio::time::timeout(limit, self.executor.flush_logs()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(limit_ms = limit.as_millis() as u64, "Durable log writes still pending");
                false
            }
        }
    }

    pub fn checkpoints(&self) -> Arc<dyn CheckpointStore> {
        Arc::clone(&self.checkpoints)
    }

    pub fn store(&self) -> &InMemoryVectorStore {
        &self.store
    }
}

/// Runner settings carried by the application configuration
pub fn executor_settings(config: &AppConfig) -> ExecutorSettings {
    ExecutorSettings {
        workflow: config.workflow.clone(),
        retry: config.retry.clone(),
        tools: config.tools.clone(),
        quality: config.quality.clone(),
        hybrid: config.hybrid.clone(),
    }
}

/// Transport timeout for the model endpoint; the longest per-tool timeout
fn http_timeout(config: &AppConfig) -> Duration {
    let ms = ToolName::ALL
        .iter()
        .map(|tool| config.tools.timeout_ms(*tool))
        .max()
        .unwrap_or(60_000);

    Duration::from_millis(ms)
}

/// Build the configured checkpoint store on its own
pub async fn create_checkpoint_store(
    config: &AppConfig,
) -> Result<Arc<dyn CheckpointStore>, DomainError> {
    CheckpointStoreFactory::create(&config.checkpoint).await
}

/// Wire every collaborator from configuration and a corpus file
pub async fn create_orchestrator(
    config: &AppConfig,
    corpus: &Path,
    callback: Arc<dyn ActivityCallback>,
) -> anyhow::Result<Orchestrator> {
    let http = HttpClient::with_timeout(http_timeout(config))?;
    let llm = Arc::new(OpenAiCompatibleClient::from_settings(http, &config.llm));

    let store = InMemoryVectorStore::from_corpus_file(corpus, &*llm).await?;
    info!(
        corpus = %corpus.display(),
        entries = store.len().await,
        "Corpus indexed"
    );

    let checkpoints = create_checkpoint_store(config).await?;

    let sink = Arc::new(FileLogSink::new(&config.observability.log_dir));
    let channel = ObservabilityChannel::new(callback, sink);

    let collaborators = Collaborators {
        router: llm.clone(),
        embedder: llm.clone(),
        store: Arc::new(store.clone()),
        generator: llm.clone(),
        judge: llm,
    };

    let executor = WorkflowExecutorImpl::with_settings(
        collaborators,
        Arc::clone(&checkpoints),
        channel,
        executor_settings(config),
    );

    Ok(Orchestrator::new(executor, checkpoints, store))
}
