//! Live and durable observability channels bundled for the runner

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::observability::{
    ActivityCallback, AggregatedLog, DurableLogSink, LogEvent, Severity,
};

/// Live callback plus durable sink.
///
/// The in-memory event log lives on `WorkflowState`; this type carries the
/// other two audiences.
#[derive(Debug, Clone)]
pub struct ObservabilityChannel {
    callback: Arc<dyn ActivityCallback>,
    sink: Arc<dyn DurableLogSink>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ObservabilityChannel {
    pub fn new(callback: Arc<dyn ActivityCallback>, sink: Arc<dyn DurableLogSink>) -> Self {
        Self {
            callback,
            sink,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> Arc<dyn ActivityCallback> {
        Arc::clone(&self.callback)
    }

    pub fn notify(&self, message: &str, severity: Severity) {
        self.callback.notify(message, severity);
    }

    /// Forward an event to the live callback if it is a user-facing transition
    pub fn emit(&self, event: &LogEvent) {
        if event.kind.is_user_facing() {
            self.callback.notify(&event.message, event.severity);
        }
    }

    /// Write the aggregated log in the background.
    ///
    /// Failures are logged and otherwise swallowed.
    pub fn persist(&self, log: AggregatedLog) {
        let sink = Arc::clone(&self.sink);

        let handle = tokio::spawn(async move {
            let session_id = log.session_id.clone();
            match sink.write(&session_id, &log).await {
                Ok(()) => debug!(session_id, sink = sink.sink_name(), "Durable log persisted"),
                Err(e) => warn!(
                    session_id,
                    sink = sink.sink_name(),
                    error = %e,
                    "Failed to persist durable log"
                ),
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for every background write started so far
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Durable log task failed");
            }
        }
    }
}
