//! # msbuild-editor-base
//!
//! Core library for MSBuild project parsing, import resolution, schemas and
//! semantic analysis, for use by editors.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide          → offset resolver, completion, hover, goto-definition
//!   ↓
//! project      → RootDocument, import graph, SDKs, runtime, frameworks
//!   ↓
//! diagnostics  → Diagnostic model, document validator
//!   ↓
//! visitor      → grammar-resolved tree walk shared by every analysis
//!   ↓
//! schema       → value kinds, symbols, declared/built-in/inferred schemas
//!   ↓
//! syntax       → static element/attribute grammar table
//!   ↓
//! expression   → expression and condition parser, trigger states, evaluation
//!   ↓
//! parser       → error-tolerant XML parser with exact spans
//!   ↓
//! base         → TextRange, LineIndex, case-insensitive names
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → expression → syntax → schema →
// visitor → diagnostics → project → ide)
// ============================================================================

/// Foundation types: TextRange, LineIndex, case-insensitive Name keys
pub mod base;

/// Analysis options
pub mod config;

/// Error types shared across modules
pub mod error;

/// Error-tolerant XML parser
pub mod parser;

/// MSBuild expressions and conditions
pub mod expression;

/// MSBuild grammar table
pub mod syntax;

/// Value kinds, symbols and schemas
pub mod schema;

/// Grammar-resolved document walker
pub mod visitor;

/// Diagnostics and the document validator
pub mod diagnostics;

/// Documents, imports, SDKs and the runtime environment
pub mod project;

/// IDE features: resolver, completion, hover, goto-definition
pub mod ide;

// Re-export foundation types
pub use base::{LineCol, LineIndex, Name, NameMap, NameSet, TextRange, TextSize};
pub use config::AnalysisOptions;
pub use diagnostics::{Diagnostic, Severity};
pub use error::Cancelled;
pub use project::{ParseContext, RootDocument};
pub use tokio_util::sync::CancellationToken;
