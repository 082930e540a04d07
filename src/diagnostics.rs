//! Sinks receiving the recoverable conditions met while reading.
use log::warn;
use parking_lot::Mutex;

use crate::error::Diagnostic;

/// Receives recoverable conditions. Implementations must not fail nor
/// influence the reading, they only observe.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to the log facade as a warning
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// Keeps diagnostics in memory, in reporting order, and logs them too
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
    /// copy of the diagnostics reported so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }
    /// removes and returns the diagnostics reported so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.lock().push(diagnostic);
    }
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &S {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for std::sync::Arc<S> {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}
