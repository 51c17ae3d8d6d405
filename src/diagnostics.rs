//! Non-fatal error and warning reporting.
//!
//! Errors raised while evaluating a top-level form, and warnings from the
//! parser and binder, are recorded here instead of ending the session.

use std::fmt;

/// Diagnostics kept for inspection; the oldest half is discarded when full
pub const MAX_RETAINED_DIAGNOSTICS: usize = 1_000;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// The most recent diagnostics of one program, optionally echoed to stderr
/// as they arrive.
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
    entries: Vec<Diagnostic>,
    echo: bool,
}

impl DiagnosticQueue {
    pub fn new(echo: bool) -> Self {
        DiagnosticQueue {
            entries: Vec::new(),
            echo,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => tracing::debug!(message = %diagnostic.message, "error reported"),
            Severity::Warning => tracing::debug!(message = %diagnostic.message, "warning reported"),
        }
        if self.echo {
            eprintln!("{diagnostic}");
        }
        if self.entries.len() >= MAX_RETAINED_DIAGNOSTICS {
            self.entries.drain(..MAX_RETAINED_DIAGNOSTICS / 2);
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Remove and return everything collected so far
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}
