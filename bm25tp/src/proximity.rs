//! Term-proximity scoring.
//!
//! Consecutive non-overlapping hit occurrences of two different query terms
//! reward each other with the partner's idf over their squared distance.
//! A pair that also appears at the same distance in the query raises the
//! document's boost multiplier.

use crate::bm25::{saturation, IdfTable, BASE_BOOST, K1};
use crate::decay::{decay_factor, DecayState};
use crate::term_index::{HitMark, TermPositionIndex};
use std::collections::BTreeMap;

/// Added to the boost for every adjacent pair that mirrors query order.
pub const PAIR_BOOST_STEP: f64 = 0.1;

/// Proximity result for one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityScore {
    /// Already multiplied by `boost`.
    pub score: f64,
    /// Multiplier reached for this document; starts at [`BASE_BOOST`].
    pub boost: f64,
}

impl ProximityScore {
    fn zero() -> Self {
        Self { score: 0.0, boost: BASE_BOOST }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityScorer;

impl ProximityScorer {
    /// Score `doc` against `query`.
    ///
    /// The decay state is only read here; usage is recorded by BM25.
    pub fn score(
        &self,
        doc: &TermPositionIndex,
        query: &TermPositionIndex,
        idf: &IdfTable,
        avg_doc_len: f64,
        decay: Option<&DecayState>,
    ) -> ProximityScore {
        if doc.len() <= 1 || query.distinct_terms() <= 1 {
            return ProximityScore::zero();
        }

        let k = saturation(doc.len(), avg_doc_len);
        let mut boost = BASE_BOOST;
        let mut acc: BTreeMap<&str, f64> = query.term_counts().keys().map(|t| (t.as_str(), 0.0)).collect();

        for i in 0..doc.len() {
            if doc.hit(i) != HitMark::Hit {
                continue;
            }
            let Some(j) = doc.next_chained_hit(i) else {
                continue;
            };
            let (t1, t2) = (doc.term(i), doc.term(j));
            if t1 == t2 || !query.contains(t1) || !query.contains(t2) {
                continue;
            }

            let gap = j - i;
            if (0..query.len().saturating_sub(gap)).any(|m| query.term(m) == t1 && query.term(m + gap) == t2) {
                boost += PAIR_BOOST_STEP;
            }

            let dis = (gap * gap) as f64;
            let idf1 = idf.get_or_zero(t1);
            let idf2 = idf.get_or_zero(t2);
            if let Some(a) = acc.get_mut(t1) {
                *a += idf2 / dis;
            }
            if let Some(a) = acc.get_mut(t2) {
                *a += idf1 / dis;
            }
        }

        let mut score = 0.0;
        for (term, tp) in acc {
            let factor = decay_factor(decay, term);
            score += factor * idf.get_or_zero(term).min(1.0) * tp * (K1 + 1.0) / (tp + k);
        }

        ProximityScore { score: score * boost, boost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term_index::{DOCUMENT_PAD, QUERY_PAD};

    fn query(terms: &[&str]) -> TermPositionIndex {
        let mut builder = TermPositionIndex::builder();
        let mut offset = 0;
        for term in terms {
            builder.add(term, offset);
            offset += term.chars().count() + 1;
        }
        builder.finalize(QUERY_PAD).unwrap()
    }

    fn doc(terms: &[&str], query: &TermPositionIndex) -> TermPositionIndex {
        let mut builder = TermPositionIndex::builder();
        let mut offset = 0;
        for term in terms {
            let mark = if query.contains(term) { HitMark::Hit } else { HitMark::Miss };
            builder.add_marked(term, offset, mark);
            offset += term.chars().count() + 1;
        }
        builder.finalize(DOCUMENT_PAD).unwrap()
    }

    fn idf_table(q: &TermPositionIndex) -> IdfTable {
        IdfTable::for_query(q, 3, |_| 1)
    }

    // ── degenerate inputs ───────────────────────────────────────

    #[test]
    fn test_single_occurrence_document_scores_zero() {
        let q = query(&["term", "proximity"]);
        let d = doc(&["term"], &q);
        let result = ProximityScorer.score(&d, &q, &idf_table(&q), 2.0, None);
        assert_eq!(result, ProximityScore { score: 0.0, boost: BASE_BOOST });
    }

    #[test]
    fn test_single_term_query_scores_zero() {
        let q = query(&["term", "term"]);
        let d = doc(&["term", "term"], &q);
        assert_eq!(ProximityScorer.score(&d, &q, &idf_table(&q), 2.0, None).score, 0.0);
    }

    #[test]
    fn test_repeated_term_pairs_are_ignored() {
        let q = query(&["a", "b"]);
        let d = doc(&["a", "a", "a"], &q);
        let result = ProximityScorer.score(&d, &q, &idf_table(&q), 3.0, None);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.boost, BASE_BOOST);
    }

    // ── ordering and distance ───────────────────────────────────

    #[test]
    fn test_query_order_pair_raises_boost() {
        let q = query(&["term", "proximity"]);
        let d = doc(&["term", "proximity"], &q);
        let result = ProximityScorer.score(&d, &q, &idf_table(&q), 2.0, None);
        assert!((result.boost - (BASE_BOOST + PAIR_BOOST_STEP)).abs() < 1e-12);
        assert!(result.score > 0.0);
    }

    #[test]
    fn test_reversed_pair_scores_without_boost() {
        let q = query(&["term", "proximity"]);
        let forward = doc(&["term", "proximity"], &q);
        let reversed = doc(&["proximity", "term"], &q);
        let table = idf_table(&q);
        let f = ProximityScorer.score(&forward, &q, &table, 2.0, None);
        let r = ProximityScorer.score(&reversed, &q, &table, 2.0, None);
        assert_eq!(r.boost, BASE_BOOST);
        assert!(r.score > 0.0);
        assert!(f.score > r.score);
    }

    #[test]
    fn test_closer_pair_scores_higher() {
        let q = query(&["a", "b"]);
        let table = idf_table(&q);
        let near = doc(&["a", "b", "x", "x"], &q);
        let far = doc(&["a", "x", "x", "b"], &q);
        let near_score = ProximityScorer.score(&near, &q, &table, 4.0, None).score;
        let far_score = ProximityScorer.score(&far, &q, &table, 4.0, None).score;
        assert!(near_score > far_score);
    }

    #[test]
    fn test_known_value_for_adjacent_pair() {
        let q = query(&["a", "b"]);
        let table = idf_table(&q);
        let d = doc(&["a", "b"], &q);
        let result = ProximityScorer.score(&d, &q, &table, 2.0, None);

        let idf = crate::bm25::idf(3, 1);
        let k = saturation(2, 2.0);
        let per_term = idf.min(1.0) * idf * (K1 + 1.0) / (idf + k);
        let boost = BASE_BOOST + PAIR_BOOST_STEP;
        assert!((result.score - 2.0 * per_term * boost).abs() < 1e-12);
    }

    // ── decay ───────────────────────────────────────────────────

    #[test]
    fn test_decay_is_read_not_recorded() {
        let q = query(&["a", "b"]);
        let table = idf_table(&q);
        let d = doc(&["a", "b"], &q);
        let fresh = DecayState::new(1.0);
        let mut used = DecayState::new(1.0);
        used.record("a");
        used.record("b");

        let undecayed = ProximityScorer.score(&d, &q, &table, 2.0, Some(&fresh)).score;
        let decayed = ProximityScorer.score(&d, &q, &table, 2.0, Some(&used)).score;
        assert!((decayed / undecayed - (-1.0f64).exp()).abs() < 1e-9);
        assert_eq!(used.usage("a"), 1);
    }
}
