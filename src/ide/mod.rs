//! IDE features: high-level queries over a parsed [`RootDocument`].
//!
//! Every query takes a root document and a byte offset and returns plain
//! data. Conversion to a protocol's types happens at the caller.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: a `RootDocument` is immutable, queries never mutate it
//! 2. **No LSP types**: ranges are `TextRange`s into the document text
//! 3. **One spine walk**: everything starts from [`resolve_at`]
//!
//! ## Usage
//!
//! ```ignore
//! use msbuild::ide::{completions, goto_definition, resolve_at};
//!
//! let root = RootDocument::parse(path, text, None, &cx)?;
//! let reference = resolve_at(&root, offset);
//! let items = completions(&root, offset, Some('('));
//! ```
//!
//! [`RootDocument`]: crate::project::RootDocument

mod completion;
mod goto;
mod hover;
mod resolver;

pub use completion::{CompletionItem, CompletionKind, CompletionResult, completions};
pub use goto::{GotoResult, GotoTarget, goto_definition};
pub use hover::{HoverResult, hover};
pub use resolver::{MsBuildReference, ReferenceKind, resolve_at};
