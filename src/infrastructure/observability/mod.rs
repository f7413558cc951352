//! Observability adapters

mod callback;
mod channel;
mod file_sink;

pub use callback::{NoopActivityCallback, TracingActivityCallback};
pub use channel::ObservabilityChannel;
pub use file_sink::{FileLogSink, NoopLogSink};
