//! Diagnostic assertion helpers.

use msbuild::project::RootDocument;
use msbuild::{Diagnostic, Severity};

/// Diagnostics with the given code.
pub fn with_code<'a>(root: &'a RootDocument, code: &str) -> Vec<&'a Diagnostic> {
    root.diagnostics.iter().filter(|d| d.code == code).collect()
}

/// Error-level diagnostics.
pub fn errors(root: &RootDocument) -> Vec<&Diagnostic> {
    root.diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect()
}

/// The text each diagnostic with `code` covers.
pub fn spans<'a>(root: &'a RootDocument, code: &str) -> Vec<&'a str> {
    with_code(root, code)
        .into_iter()
        .map(|d| &root.text[d.range])
        .collect()
}

/// Assert a document has no error-level diagnostics.
pub fn assert_no_errors(root: &RootDocument) {
    let errors = errors(root);
    assert!(
        errors.is_empty(),
        "Expected no errors, got {} error(s):\n{}",
        errors.len(),
        errors
            .iter()
            .map(|e| format!("  {} {:?}: {}", e.code, e.range, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
