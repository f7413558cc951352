//! Observability domain: event log entries, live callbacks, durable sinks

mod callback;
mod event;
mod sink;

pub use callback::ActivityCallback;
pub use event::{EventKind, LogEvent, Severity};
pub use sink::{AggregatedLog, DurableLogSink};

#[cfg(test)]
pub use callback::MockActivityCallback;
#[cfg(test)]
pub use sink::MockDurableLogSink;
