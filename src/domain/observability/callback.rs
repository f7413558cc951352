//! Live progress notifications

use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::event::Severity;

/// Fire-and-forget user-facing progress updates.
///
/// Implementations must return quickly and must not fail; the workflow never
/// waits on them.
#[cfg_attr(test, automock)]
pub trait ActivityCallback: Send + Sync + Debug {
    fn notify(&self, message: &str, severity: Severity);
}
