//! BM25 term scoring with an optional decay state, and the idf table shared
//! by every scorer in a rescore call.

use crate::decay::DecayState;
use crate::term_index::TermPositionIndex;
use std::collections::{BTreeMap, HashMap};

/// Term-frequency saturation.
pub const K1: f64 = 1.2;

/// Length normalization.
pub const B: f64 = 0.75;

/// Multiplier applied to every BM25 term score and the starting value of
/// each document's proximity boost.
pub const BASE_BOOST: f64 = 2.2;

/// `ln(1 + (N - df + 0.5) / (df + 0.5))`; non-negative whenever `df <= N`.
pub fn idf(total_docs: u64, doc_freq: u64) -> f64 {
    let n = total_docs as f64;
    let df = doc_freq as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Length-normalized saturation constant `K` for a document of `doc_len`
/// positioned occurrences.
pub fn saturation(doc_len: usize, avg_doc_len: f64) -> f64 {
    K1 * (1.0 - B + B * doc_len as f64 / avg_doc_len)
}

/// idf of each distinct query term, iterated in term order.
#[derive(Debug, Clone, Default)]
pub struct IdfTable {
    by_term: BTreeMap<String, f64>,
}

impl IdfTable {
    /// Look up document frequencies for every distinct term of `query`.
    pub fn for_query<F>(query: &TermPositionIndex, total_docs: u64, doc_freq: F) -> Self
    where
        F: Fn(&str) -> u64,
    {
        let by_term = query
            .term_counts()
            .keys()
            .map(|term| (term.clone(), idf(total_docs, doc_freq(term))))
            .collect();
        Self { by_term }
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.by_term.get(term).copied()
    }

    pub fn get_or_zero(&self, term: &str) -> f64 {
        self.get(term).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.by_term.iter().map(|(t, &v)| (t.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_term.is_empty()
    }
}

/// BM25 over the query terms a document contains.
///
/// The per-term score is multiplied by the raw in-document frequency on top
/// of the saturated `tf / (tf + K)`, so repeated terms keep gaining weight.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    boost: f64,
}

impl Default for Bm25Scorer {
    fn default() -> Self {
        Self { boost: BASE_BOOST }
    }
}

impl Bm25Scorer {
    /// Score one document.
    ///
    /// With a decay state, each matched term is scored at its current decay
    /// factor and then has its usage count bumped, so the next document in
    /// iteration order sees it as used once more.
    pub fn score(
        &self,
        doc_len: usize,
        avg_doc_len: f64,
        doc_term_freq: &HashMap<String, u64>,
        query: &TermPositionIndex,
        idf: &IdfTable,
        mut decay: Option<&mut DecayState>,
    ) -> f64 {
        let k = saturation(doc_len, avg_doc_len);
        let mut score = 0.0;
        for (term, idf_score) in idf.iter() {
            let Some(&tf) = doc_term_freq.get(term) else {
                continue;
            };
            let freq = (query.term_count(term) as u64).min(tf) as f64;
            let tf_score = freq / (freq + k);
            let decay_factor = match decay.as_deref_mut() {
                Some(state) => {
                    let factor = state.factor(term);
                    state.record(term);
                    factor
                }
                None => 1.0,
            };
            score += decay_factor * self.boost * idf_score * tf_score * tf as f64;
        }
        score
    }
}
