//! Offset-ordered term occurrences for one text, plus a character coverage map.
//!
//! Built once for the query and once per candidate document. Occurrences are
//! sorted by `(offset, term length)` so that overlapping segmentations
//! ("总要求" split as "总要" + "要求") resolve the same way on every run.

use crate::interface::{RescoreError, RescoreResult, Token};
use std::collections::HashMap;

/// Pad character for uncovered query positions.
pub const QUERY_PAD: char = 'q';

/// Pad character for uncovered document positions.
pub const DOCUMENT_PAD: char = 'd';

/// Whether a document occurrence's term also occurs in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMark {
    /// Not classified (query occurrences).
    Unmarked,
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
struct Occurrence {
    term: String,
    offset: usize,
    len: usize,
    hit: HitMark,
}

/// Accumulates occurrences before `finalize`.
#[derive(Debug, Default)]
pub struct TermIndexBuilder {
    occurrences: Vec<Occurrence>,
    term_counts: HashMap<String, usize>,
}

impl TermIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, term: &str, offset: usize) -> &mut Self {
        self.add_marked(term, offset, HitMark::Unmarked)
    }

    pub fn add_marked(&mut self, term: &str, offset: usize, hit: HitMark) -> &mut Self {
        self.occurrences.push(Occurrence {
            term: term.to_string(),
            offset,
            len: term.chars().count(),
            hit,
        });
        *self.term_counts.entry(term.to_string()).or_insert(0) += 1;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Sort occurrences and derive the raw text and coverage map.
    ///
    /// Uncovered positions hold `pad`. Where occurrences overlap, coverage
    /// belongs to the first occurrence in sorted order that reached the
    /// position; the character itself is the last one written.
    pub fn finalize(self, pad: char) -> RescoreResult<TermPositionIndex> {
        let TermIndexBuilder { mut occurrences, term_counts } = self;
        if occurrences.is_empty() {
            return Err(RescoreError::EmptyText);
        }
        occurrences.sort_by(|a, b| a.offset.cmp(&b.offset).then(a.len.cmp(&b.len)));

        // Sorted by offset, but a short late token can still end before a long early one.
        let text_len = occurrences.iter().map(|o| o.offset + o.len).max().unwrap_or(0);
        let mut raw_text = vec![pad; text_len];
        let mut coverage: Vec<Option<usize>> = vec![None; text_len];

        for (i, occ) in occurrences.iter().enumerate() {
            for (j, c) in occ.term.chars().enumerate() {
                let pos = occ.offset + j;
                raw_text[pos] = c;
                if coverage[pos].is_none() {
                    coverage[pos] = Some(i);
                }
            }
        }

        Ok(TermPositionIndex { occurrences, term_counts, raw_text, coverage })
    }
}

/// Finalized, read-only index of one text's term occurrences.
#[derive(Debug, Clone)]
pub struct TermPositionIndex {
    occurrences: Vec<Occurrence>,
    term_counts: HashMap<String, usize>,
    raw_text: Vec<char>,
    coverage: Vec<Option<usize>>,
}

impl TermPositionIndex {
    pub fn builder() -> TermIndexBuilder {
        TermIndexBuilder::new()
    }

    /// Index analyzed tokens (query side: occurrences stay unmarked).
    pub fn from_tokens(tokens: &[Token], pad: char) -> RescoreResult<Self> {
        let mut builder = TermIndexBuilder::new();
        for token in tokens {
            builder.add(&token.term, token.offset);
        }
        builder.finalize(pad)
    }

    /// Number of occurrences.
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn term(&self, i: usize) -> &str {
        &self.occurrences[i].term
    }

    pub fn offset(&self, i: usize) -> usize {
        self.occurrences[i].offset
    }

    /// Length of occurrence `i` in characters.
    pub fn term_len(&self, i: usize) -> usize {
        self.occurrences[i].len
    }

    pub fn hit(&self, i: usize) -> HitMark {
        self.occurrences[i].hit
    }

    /// Index of the occurrence owning character `offset`, `None` if uncovered
    /// or out of range.
    pub fn coverage_at(&self, offset: usize) -> Option<usize> {
        self.coverage.get(offset).copied().flatten()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.term_counts.contains_key(term)
    }

    /// How many times `term` occurs (the query-side multiplicity).
    pub fn term_count(&self, term: &str) -> usize {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    pub fn distinct_terms(&self) -> usize {
        self.term_counts.len()
    }

    pub fn term_counts(&self) -> &HashMap<String, usize> {
        &self.term_counts
    }

    pub fn raw_text(&self) -> &[char] {
        &self.raw_text
    }

    /// Length of the raw text in characters (`max(offset + len)`).
    pub fn text_len(&self) -> usize {
        self.raw_text.len()
    }

    pub fn char_at(&self, pos: usize) -> char {
        self.raw_text[pos]
    }

    /// First occurrence after `i` that is a hit and starts at or after the
    /// end of `i`.
    pub fn next_chained_hit(&self, i: usize) -> Option<usize> {
        let end = self.offset(i) + self.term_len(i);
        (i + 1..self.len()).find(|&j| self.hit(j) == HitMark::Hit && self.offset(j) >= end)
    }
}
