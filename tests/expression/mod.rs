//! Expression engine tests
//!
//! Tests for:
//! - Completion trigger states while typing

pub mod tests_trigger;
