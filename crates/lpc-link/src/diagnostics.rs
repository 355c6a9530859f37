//! Per-link diagnostics sink.
//!
//! Every link call owns one [`Diagnostics`]. Errors and warnings are kept
//! as structured entries and rendered into the program info log as
//! `error: <msg>` / `warning: <msg>` lines.

use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};

use log::warn;

use crate::error::{ErrorCategory, LinkError, LinkResult, LinkWarning};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Failure class, for errors
    pub category: Option<ErrorCategory>,
    /// Rendered message, without the severity prefix
    pub message: String,
}

/// Collects the diagnostics of one link call.
#[derive(Debug, Default)]
pub struct Diagnostics {
    log: String,
    entries: Vec<Diagnostic>,
    errors: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, error: LinkError) {
        let message = error.to_string();
        self.log.push_str(&format!("error: {}\n", message));
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            category: Some(error.category()),
            message,
        });
        self.errors += 1;
    }

    /// Record a warning; the link status is unaffected.
    pub fn warning(&mut self, warning: LinkWarning) {
        let message = warning.to_string();
        warn!("{}", message);
        self.log.push_str(&format!("warning: {}\n", message));
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            category: None,
            message,
        });
    }

    /// Record the error of a failed step and return the value of a
    /// successful one.
    pub fn record<T>(&mut self, result: LinkResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.error(error);
                None
            }
        }
    }

    /// Whether any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// The rendered log.
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Structured entries in record order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Split into the rendered log and the structured entries.
    pub fn into_parts(self) -> (String, Vec<Diagnostic>) {
        (self.log, self.entries)
    }
}
