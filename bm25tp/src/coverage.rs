//! Character-coverage admission gate.
//!
//! A document is worth proximity and adjacency work only if at least half of
//! its characters appear somewhere in the query. Rejected documents keep
//! their place in the candidate list but carry `INELIGIBLE_SCORE`.

use crate::term_index::TermPositionIndex;
use std::collections::HashSet;

/// Minimum coverage ratio for admission (inclusive).
pub const COVERAGE_THRESHOLD: f64 = 0.5;

/// Score assigned to documents the gate rejects; below any eligible score
/// built from non-negative components.
pub const INELIGIBLE_SCORE: f64 = -1.0;

/// Character coverage of one document against the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharCoverage {
    /// Covered document positions whose character occurs in the query.
    pub hits: usize,
    /// Raw text length of the document, pads included.
    pub len: usize,
}

impl CharCoverage {
    pub fn ratio(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.hits as f64 / self.len as f64
    }
}

/// Admits documents whose coverage ratio reaches the threshold.
#[derive(Debug, Clone)]
pub struct CharCoverageGate {
    query_chars: HashSet<char>,
    threshold: f64,
}

impl CharCoverageGate {
    pub fn new(query: &str) -> Self {
        Self::with_threshold(query, COVERAGE_THRESHOLD)
    }

    pub fn with_threshold(query: &str, threshold: f64) -> Self {
        Self {
            query_chars: query.chars().collect(),
            threshold,
        }
    }

    /// Count covered document characters that also occur in the query.
    pub fn measure(&self, doc: &TermPositionIndex) -> CharCoverage {
        let hits = doc
            .raw_text()
            .iter()
            .enumerate()
            .filter(|&(pos, c)| doc.coverage_at(pos).is_some() && self.query_chars.contains(c))
            .count();
        CharCoverage { hits, len: doc.text_len() }
    }

    pub fn admits_ratio(&self, ratio: f64) -> bool {
        ratio >= self.threshold
    }

    pub fn admits(&self, coverage: CharCoverage) -> bool {
        coverage.len > 0 && self.admits_ratio(coverage.ratio())
    }
}
