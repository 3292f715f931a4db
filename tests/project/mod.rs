//! Project model tests
//!
//! Tests for:
//! - Reuse of unchanged imports between parses
//! - Import resolution across files, SDKs and wildcards

pub mod tests_imports;
pub mod tests_reuse;
