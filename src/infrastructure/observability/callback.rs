//! Activity callback implementations

use tracing::{error, info, warn};

use crate::domain::observability::{ActivityCallback, Severity};

/// Forwards progress notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityCallback;

impl ActivityCallback for TracingActivityCallback {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!(target: "activity", "{}", message),
            Severity::Warning => warn!(target: "activity", "{}", message),
            Severity::Error => error!(target: "activity", "{}", message),
        }
    }
}

/// Discards notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActivityCallback;

impl ActivityCallback for NoopActivityCallback {
    fn notify(&self, _message: &str, _severity: Severity) {}
}
