//! Rescore candidate with its extracted features.
//!
//! Fields are private, so once a document has been extracted nothing in the
//! scoring passes can change its term index, frequencies or admission.

use crate::coverage::{CharCoverage, CharCoverageGate};
use crate::interface::{DocId, Hit, TermVector};
use crate::term_index::{HitMark, TermPositionIndex, DOCUMENT_PAD};
use std::collections::HashMap;

/// One document from the rescore window.
#[derive(Debug, Clone)]
pub struct CandidateDocument {
    doc_id: DocId,
    base_score: f32,
    rank_original: usize,
    /// `None` when the document had no term vector or no positioned terms.
    terms: Option<TermPositionIndex>,
    term_freq: HashMap<String, u64>,
    coverage: CharCoverage,
    eligible: bool,
}

impl CandidateDocument {
    /// Build the document's term index from its term vector, marking each
    /// occurrence as a hit or miss against the query, and run the gate.
    pub fn extract(
        hit: &Hit,
        rank_original: usize,
        vector: &TermVector,
        query: &TermPositionIndex,
        gate: &CharCoverageGate,
    ) -> Self {
        let mut builder = TermPositionIndex::builder();
        let mut term_freq = HashMap::with_capacity(vector.len());
        for entry in vector {
            let mark = if query.contains(&entry.term) { HitMark::Hit } else { HitMark::Miss };
            for &offset in &entry.offsets {
                builder.add_marked(&entry.term, offset, mark);
            }
            *term_freq.entry(entry.term.clone()).or_insert(0) += entry.frequency;
        }

        let terms = builder.finalize(DOCUMENT_PAD).ok();
        let coverage = terms.as_ref().map(|t| gate.measure(t)).unwrap_or_default();
        let eligible = terms.is_some() && gate.admits(coverage);

        Self {
            doc_id: hit.doc_id,
            base_score: hit.score,
            rank_original,
            terms,
            term_freq,
            coverage,
            eligible,
        }
    }

    /// A document whose term vector could not be read. It stays in the
    /// window but is never admitted.
    pub fn missing(hit: &Hit, rank_original: usize) -> Self {
        Self {
            doc_id: hit.doc_id,
            base_score: hit.score,
            rank_original,
            terms: None,
            term_freq: HashMap::new(),
            coverage: CharCoverage::default(),
            eligible: false,
        }
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    /// Position in the first-pass result list.
    pub fn rank_original(&self) -> usize {
        self.rank_original
    }

    pub fn terms(&self) -> Option<&TermPositionIndex> {
        self.terms.as_ref()
    }

    pub fn term_freq(&self) -> &HashMap<String, u64> {
        &self.term_freq
    }

    pub fn coverage(&self) -> CharCoverage {
        self.coverage
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Positioned term occurrences, the length used for BM25 normalization.
    pub fn occurrences(&self) -> usize {
        self.terms.as_ref().map_or(0, |t| t.len())
    }
}
