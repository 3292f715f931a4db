//! Diagnostics: problems reported against the top-level document.
//!
//! Imported documents never own diagnostics. Everything found while building
//! a [`RootDocument`](crate::project::RootDocument) (XML errors, unresolved
//! imports and SDKs, validator findings) lands in one flat list.

mod validator;

use text_size::TextRange;

pub use validator::DocumentValidator;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: Severity,
    /// Rule identifier from [`codes`]
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            range: TextRange::default(),
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = range;
        self
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable rule identifiers.
pub mod codes {
    // ========================================================================
    // STRUCTURE
    // ========================================================================

    /// Malformed XML.
    pub const XML_ERROR: &str = "MSB0001";
    /// Element not allowed in this position.
    pub const UNKNOWN_ELEMENT: &str = "MSB0002";
    /// Attribute not allowed on this element.
    pub const UNKNOWN_ATTRIBUTE: &str = "MSB0003";
    pub const MISSING_REQUIRED_ATTRIBUTE: &str = "MSB0004";
    /// Item outside a target with no Include, Update or Remove.
    pub const ITEM_OPERATION_REQUIRED: &str = "MSB0005";
    /// Syntax error in an expression or condition.
    pub const EXPRESSION_ERROR: &str = "MSB0006";

    // ========================================================================
    // IMPORTS
    // ========================================================================

    pub const IMPORT_UNRESOLVED: &str = "MSB0007";
    pub const SDK_UNRESOLVED: &str = "MSB0008";
    /// Item or metadata reference in `Import/@Project`.
    pub const IMPORT_ITEMS_NOT_PERMITTED: &str = "MSB0009";
    pub const CIRCULAR_IMPORT: &str = "MSB0010";

    // ========================================================================
    // VALUES AND SYMBOLS
    // ========================================================================

    /// Literal not valid for the value kind.
    pub const INVALID_VALUE: &str = "MSB0011";
    /// Literal not among the values of a custom type.
    pub const UNKNOWN_VALUE: &str = "MSB0012";
    pub const LIST_NOT_PERMITTED: &str = "MSB0013";
    pub const UNKNOWN_TASK: &str = "MSB0014";
    pub const UNKNOWN_TASK_PARAMETER: &str = "MSB0015";
    pub const MISSING_TASK_PARAMETER: &str = "MSB0016";
    pub const UNKNOWN_TARGET: &str = "MSB0017";
    pub const DEPRECATED: &str = "MSB0018";
    /// Written but never read, and unknown to every schema.
    pub const POSSIBLY_UNUSED: &str = "MSB0019";
    pub const EMPTY_REQUIRED_VALUE: &str = "MSB0020";
    /// A visitor hook failed.
    pub const INTERNAL_ERROR: &str = "MSB0021";
    /// The project writes a private name owned by an import.
    pub const PRIVATE_SYMBOL: &str = "MSB0022";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during analysis.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, code: &'static str, range: TextRange, message: impl Into<String>) {
        self.add(Diagnostic::error(code, message).with_range(range));
    }

    pub fn warning(&mut self, code: &'static str, range: TextRange, message: impl Into<String>) {
        self.add(Diagnostic::warning(code, message).with_range(range));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics in source order.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by_key(|d| d.range.start());
        self.diagnostics
    }
}

impl Extend<Diagnostic> for DiagnosticCollector {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::range;

    #[test]
    fn test_diagnostic_builders() {
        let diagnostic = Diagnostic::warning(codes::UNKNOWN_TARGET, "Target 'Foo' is not defined").with_range(range(3, 6));
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.code, "MSB0017");
        assert_eq!(diagnostic.range, range(3, 6));
    }

    #[test]
    fn test_collector_counts_and_order() {
        let mut collector = DiagnosticCollector::new();
        collector.warning(codes::DEPRECATED, range(10, 12), "old");
        collector.error(codes::XML_ERROR, range(0, 1), "bad");
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.has_errors());
        let diagnostics = collector.finish();
        assert_eq!(diagnostics[0].code, codes::XML_ERROR);
    }
}
