//! Foundation types for the MSBuild toolchain.
//!
//! This module provides fundamental types used throughout the library:
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Name`], [`NameMap`], [`NameSet`] - Case-insensitive symbol names
//!
//! This module has NO dependencies on other modules of the crate.

mod name;
mod position;

pub use name::{Name, NameMap, NameSet};
pub use position::{LineCol, LineIndex};

// Re-export text-size types for convenience
pub use text_size;
pub use text_size::{TextRange, TextSize};

/// Build a [`TextRange`] from `usize` offsets.
pub fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(size(start), size(end.max(start)))
}

/// Convert a `usize` offset into a [`TextSize`].
pub fn size(offset: usize) -> TextSize {
    TextSize::new(offset as u32)
}

/// Returns true when `offset` is inside `range`, counting the end as inside.
///
/// Editors report the caret *after* the last typed character, so a name that
/// ends exactly at the caret still belongs to the caret.
pub fn touches(range: TextRange, offset: TextSize) -> bool {
    range.start() <= offset && offset <= range.end()
}
