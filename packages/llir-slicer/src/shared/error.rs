//! Error taxonomy for the analysis core.
//!
//! Mirrors the failure taxonomy of the design: malformed input is fatal,
//! structural-invariant violations are surfaced as diagnostics the driver
//! may choose to abort on, and budget/iteration limits are *not* errors —
//! they trigger documented conservative widening and are reported only as
//! [`Diagnostic::warning`]s.

use std::fmt;

/// Broad categorization of an [`AnalysisError`], used for filtering and
/// for mapping onto a host's diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing operands, wrong arity, missing entry function, unknown
    /// instruction kind.
    Malformed,
    /// A structural invariant checked by a validator was violated.
    InvariantViolated,
    /// A fixpoint did not converge within its iteration/size budget.
    BudgetExceeded,
    /// Programming error: an operation was attempted on reserved node ID 0.
    InvalidNode,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::InvariantViolated => "invariant_violated",
            ErrorKind::BudgetExceeded => "budget_exceeded",
            ErrorKind::InvalidNode => "invalid_node",
        }
    }
}

/// The core fallible-operation error type.
#[derive(Debug, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct AnalysisError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AnalysisError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Malformed, message: message.into() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::InvariantViolated, message: message.into() }
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::BudgetExceeded, message: message.into() }
    }

    pub fn invalid_node(id: u32) -> Self {
        Self {
            kind: ErrorKind::InvalidNode,
            message: format!("operation attempted on reserved/invalid node id {id}"),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Severity of an accumulated validator finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single accumulated validator/analysis finding. Validators collect
/// these rather than failing fast, per the design's propagation policy:
/// "Validators accumulate error and warning strings and return a single
/// boolean."
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning: {}", self.message),
            Severity::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Accumulator used by validators: collect diagnostics, then decide
/// pass/fail once at the end instead of short-circuiting on the first
/// problem.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::warning(message));
    }

    /// The single boolean a validator returns: true iff no errors were
    /// accumulated (warnings do not fail validation).
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_ok_with_only_warnings() {
        let mut sink = DiagnosticSink::new();
        sink.warning("precision loss at call site 4");
        assert!(sink.is_ok());
    }

    #[test]
    fn sink_fails_with_any_error() {
        let mut sink = DiagnosticSink::new();
        sink.warning("minor");
        sink.error("phi with zero operands");
        assert!(!sink.is_ok());
        assert_eq!(sink.diagnostics().len(), 2);
    }
}
