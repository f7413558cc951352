//! Progress notifications printed to stderr

use std::io::Write;

use crate::domain::{ActivityCallback, Severity};

/// Writes one line per notification to stderr, keeping stdout for the answer
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrProgress;

impl StderrProgress {
    pub fn format_line(message: &str, severity: Severity) -> String {
        match severity {
            Severity::Info => format!("[..] {}", message),
            Severity::Warning => format!("[!!] {}", message),
            Severity::Error => format!("[xx] {}", message),
        }
    }
}

impl ActivityCallback for StderrProgress {
    fn notify(&self, message: &str, severity: Severity) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", Self::format_line(message, severity));
    }
}
