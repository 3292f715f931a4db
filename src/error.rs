//! Error types for fallible library operations.
//!
//! Malformed project text never produces one of these: bad XML and bad
//! expressions become diagnostics or error nodes. These errors cover the
//! seams where the caller has to make a decision.

use std::path::PathBuf;

use thiserror::Error;

/// The operation was abandoned because its cancellation token fired.
///
/// This is not a failure and should not be logged as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Errors that can occur while loading a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// IO error while reading a schema file.
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema is not valid JSON or does not have the expected shape.
    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `type` value names a kind that is not in the type-name table.
    #[error("unknown value type '{0}'")]
    InvalidType(String),

    /// A `$ref` points at a custom type the schema does not define.
    #[error("unresolved type reference '{0}'")]
    UnknownTypeReference(String),

    /// A custom type was supplied for a non-custom kind or vice versa.
    #[error("custom type must be present if and only if the kind is the custom-type kind")]
    CustomTypeMismatch,
}

/// Error raised by a visitor hook.
///
/// The walker catches these per element, logs them and reports an
/// internal-error diagnostic on the element, then keeps walking.
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl VisitError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Result type for visitor hooks.
pub type VisitResult = Result<(), VisitError>;
