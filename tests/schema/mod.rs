//! Schema lookup tests
//!
//! Tests for:
//! - Lookup order of declared, inferred and built-in schemas
//! - Case-insensitive names
//! - Hiding private symbols of imported files

pub mod tests_lookup;
