//! Operator-facing output capability
//!
//! The pipeline never prints directly. Callers inject a [`Reporter`] so the
//! CLI can write to the terminal while tests record every line.

use std::sync::Mutex;

/// Sink for human-readable progress and error messages.
pub trait Reporter {
    fn inform(&self, message: &str);
    fn error(&self, message: &str);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn inform(&self, message: &str) {
        (**self).inform(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Forwards every message to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn inform(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// A reported line together with its severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedLine {
    Inform(String),
    Error(String),
}

/// Keeps every reported line in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<ReportedLine>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<ReportedLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportedLine::Error(message) => Some(message),
                ReportedLine::Inform(_) => None,
            })
            .collect()
    }

    #[must_use]
    pub fn informs(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportedLine::Inform(message) => Some(message),
                ReportedLine::Error(_) => None,
            })
            .collect()
    }

    fn record(&self, line: ReportedLine) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

impl Reporter for MemoryReporter {
    fn inform(&self, message: &str) {
        self.record(ReportedLine::Inform(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.record(ReportedLine::Error(message.to_string()));
    }
}
