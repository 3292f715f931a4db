//! IDE feature tests
//!
//! Tests for:
//! - Offset resolution and reference spans
//! - Code completion
//! - Go to definition
//! - Robustness against malformed input

pub mod tests_completion;
pub mod tests_goto;
pub mod tests_resolver;
pub mod tests_robustness;
