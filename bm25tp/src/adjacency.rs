//! Character adjacency bonus.
//!
//! Every exact term match between document and query looks a few characters
//! past each edge. When the document keeps agreeing with the query there,
//! inside a term the query does not contain, the document earns a small
//! bonus. This is what keeps a partial or mis-segmented hit ("总要" vs
//! "总要求") ranked close to an exact one.

use crate::term_index::TermPositionIndex;

/// Characters examined on each side of a matched term.
pub const ADJACENT_CHAR_WINDOW: usize = 3;

/// Multiplier applied to the summed bonus.
pub const ADJACENT_CHAR_WEIGHT: f64 = 2.2;

#[derive(Debug, Clone, Copy)]
pub struct AdjacentCharScorer {
    window: usize,
    weight: f64,
}

impl Default for AdjacentCharScorer {
    fn default() -> Self {
        Self { window: ADJACENT_CHAR_WINDOW, weight: ADJACENT_CHAR_WEIGHT }
    }
}

impl AdjacentCharScorer {
    pub fn new(window: usize, weight: f64) -> Self {
        Self { window, weight }
    }

    /// `idf` is asked for the covering document terms, which are generally
    /// not query terms, so it must reach the corpus.
    pub fn score<F>(&self, doc: &TermPositionIndex, query: &TermPositionIndex, idf: F) -> f64
    where
        F: Fn(&str) -> f64,
    {
        let doc_len = doc.text_len() as f64;
        let mut score = 0.0;
        for i in 0..doc.len() {
            for j in 0..query.len() {
                if doc.term(i) != query.term(j) {
                    continue;
                }
                score += self.right(doc, query, i, j, &idf, doc_len);
                score += self.left(doc, query, i, j, &idf, doc_len);
            }
        }
        score * self.weight
    }

    fn right<F>(&self, doc: &TermPositionIndex, query: &TermPositionIndex, i: usize, j: usize, idf: &F, doc_len: f64) -> f64
    where
        F: Fn(&str) -> f64,
    {
        let doc_end = doc.offset(i) + doc.term_len(i);
        let query_end = query.offset(j) + query.term_len(j);
        let mut score = 0.0;
        for k in 0..self.window {
            let (dp, qp) = (doc_end + k, query_end + k);
            if dp >= doc.text_len() || qp >= query.text_len() {
                break;
            }
            score += self.credit(doc, query, dp, qp, idf, doc_len);
        }
        score
    }

    fn left<F>(&self, doc: &TermPositionIndex, query: &TermPositionIndex, i: usize, j: usize, idf: &F, doc_len: f64) -> f64
    where
        F: Fn(&str) -> f64,
    {
        let mut score = 0.0;
        for k in 1..=self.window {
            let (Some(dp), Some(qp)) = (doc.offset(i).checked_sub(k), query.offset(j).checked_sub(k)) else {
                break;
            };
            score += self.credit(doc, query, dp, qp, idf, doc_len);
        }
        score
    }

    fn credit<F>(&self, doc: &TermPositionIndex, query: &TermPositionIndex, dp: usize, qp: usize, idf: &F, doc_len: f64) -> f64
    where
        F: Fn(&str) -> f64,
    {
        let Some(owner) = doc.coverage_at(dp) else {
            return 0.0;
        };
        let covering = doc.term(owner);
        if query.contains(covering) || doc.char_at(dp) != query.char_at(qp) {
            return 0.0;
        }
        idf(covering) / doc_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term_index::{HitMark, DOCUMENT_PAD, QUERY_PAD};

    fn index(tokens: &[(&str, usize)], pad: char, query: Option<&TermPositionIndex>) -> TermPositionIndex {
        let mut builder = TermPositionIndex::builder();
        for (term, offset) in tokens {
            let mark = match query {
                Some(q) if q.contains(term) => HitMark::Hit,
                Some(_) => HitMark::Miss,
                None => HitMark::Unmarked,
            };
            builder.add_marked(term, *offset, mark);
        }
        builder.finalize(pad).unwrap()
    }

    #[test]
    fn test_no_shared_terms_scores_zero() {
        let q = index(&[("abc", 0)], QUERY_PAD, None);
        let d = index(&[("xyz", 0)], DOCUMENT_PAD, Some(&q));
        assert_eq!(AdjacentCharScorer::default().score(&d, &q, |_| 1.0), 0.0);
    }

    #[test]
    fn test_right_continuation_earns_bonus() {
        // query "总要求" unsegmented; document splits it as 总要 + 求
        let q = index(&[("总要", 0), ("求", 2)], QUERY_PAD, None);
        let d = index(&[("总要", 0), ("求是", 2)], DOCUMENT_PAD, Some(&q));
        let score = AdjacentCharScorer::default().score(&d, &q, |_| 1.5);
        // 求 at doc position 2 matches query position 2, covered by 求是 (not a query term)
        let expected = 1.5 / 4.0 * ADJACENT_CHAR_WEIGHT;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_covering_query_term_is_skipped() {
        let q = index(&[("a", 0), ("b", 1)], QUERY_PAD, None);
        let d = index(&[("a", 0), ("b", 1)], DOCUMENT_PAD, Some(&q));
        assert_eq!(AdjacentCharScorer::default().score(&d, &q, |_| 1.0), 0.0);
    }

    #[test]
    fn test_left_continuation_earns_bonus() {
        let q = index(&[("x", 0), ("yz", 1)], QUERY_PAD, None);
        let d = index(&[("wx", 0), ("yz", 2)], DOCUMENT_PAD, Some(&q));
        // left of yz: doc 'x' at 1 vs query 'x' at 0, covered by wx
        let score = AdjacentCharScorer::default().score(&d, &q, |t| if t == "wx" { 2.0 } else { 0.0 });
        let expected = 2.0 / 4.0 * ADJACENT_CHAR_WEIGHT;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uncovered_pad_never_matches() {
        // doc pad 'd' sits where the query has a real 'd'
        let q = index(&[("ab", 0), ("d", 2)], QUERY_PAD, None);
        let d = index(&[("ab", 0), ("zz", 3)], DOCUMENT_PAD, Some(&q));
        assert_eq!(AdjacentCharScorer::default().score(&d, &q, |_| 1.0), 0.0);
    }

    #[test]
    fn test_window_bounds_the_walk() {
        let q = index(&[("a", 0), ("bcde", 1)], QUERY_PAD, None);
        let d = index(&[("a", 0), ("bcdx", 1)], DOCUMENT_PAD, Some(&q));
        let narrow = AdjacentCharScorer::new(1, 1.0).score(&d, &q, |_| 1.0);
        let wide = AdjacentCharScorer::new(3, 1.0).score(&d, &q, |_| 1.0);
        assert!((narrow - 1.0 / 5.0).abs() < 1e-12);
        assert!((wide - 3.0 / 5.0).abs() < 1e-12);
    }
}
