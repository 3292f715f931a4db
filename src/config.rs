//! Analysis options
//!
//! Plain data, deserializable so hosts can embed it in their own settings.

use serde::Deserialize;

/// Options controlling how documents are built and validated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Include `_`-prefixed names declared in imported files in listings
    pub show_private_symbols: bool,
    /// Guard against bogus wildcard imports produced by bad evaluation
    pub wildcard: WildcardHeuristic,
    /// Import `*.tasks` / `*.overridetasks` from the runtime tools path
    pub load_core_tasks: bool,
    /// Upper bound on candidate strings produced when evaluating an import path
    pub max_evaluation_permutations: usize,
    /// Report properties that are written but never read
    pub report_unused: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            show_private_symbols: false,
            wildcard: WildcardHeuristic::default(),
            load_core_tasks: true,
            max_evaluation_permutations: 64,
            report_unused: true,
        }
    }
}

/// Thresholds for treating an evaluated import path as a wildcard.
///
/// Evaluating an import with unknown properties yields short strings like
/// `\*.props`; those are discarded rather than enumerated. The values are
/// empirical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WildcardHeuristic {
    /// The first `*` must be strictly after this offset
    pub min_star_offset: usize,
    /// The last separator before the `*` must be at or after this offset
    pub min_separator_offset: usize,
}

impl Default for WildcardHeuristic {
    fn default() -> Self {
        Self {
            min_star_offset: 15,
            min_separator_offset: 10,
        }
    }
}
