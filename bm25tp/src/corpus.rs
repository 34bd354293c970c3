//! In-memory corpus statistics.
//!
//! Holds analyzed term vectors per `(document, field)` and keeps document
//! frequencies and token totals in step with them. Used for tests, benches
//! and small embedded corpora where a Tantivy index would be overkill.

use crate::analysis::SimpleAnalyzer;
use crate::interface::{
    Analyzer, CorpusStatistics, DocId, RescoreError, RescoreResult, TermVector, TermVectorEntry, Token,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct FieldStats {
    doc_freq: HashMap<String, u64>,
    total_tokens: u64,
}

#[derive(Debug, Default)]
pub struct MemoryCorpus {
    analyzer: SimpleAnalyzer,
    /// Sorted so document iteration is reproducible.
    docs: BTreeMap<DocId, HashMap<String, TermVector>>,
    fields: HashMap<String, FieldStats>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze `text` and store it as `field` of `doc_id`, replacing any
    /// previous value of that field.
    pub fn add_document(&mut self, doc_id: DocId, field: &str, text: &str) {
        let tokens = self.analyzer.tokenize(text);
        self.insert_term_vector(doc_id, field, term_vector(&tokens));
    }

    /// Store a prebuilt term vector.
    pub fn insert_term_vector(&mut self, doc_id: DocId, field: &str, vector: TermVector) {
        self.remove_field(doc_id, field);

        let stats = self.fields.entry(field.to_string()).or_default();
        for entry in &vector {
            *stats.doc_freq.entry(entry.term.clone()).or_insert(0) += 1;
            stats.total_tokens += entry.frequency;
        }
        self.docs.entry(doc_id).or_default().insert(field.to_string(), vector);
    }

    /// Drop a document. Returns whether it was present.
    pub fn remove_document(&mut self, doc_id: DocId) -> bool {
        let Some(fields) = self.docs.get(&doc_id) else {
            return false;
        };
        let names: Vec<String> = fields.keys().cloned().collect();
        for field in names {
            self.remove_field(doc_id, &field);
        }
        self.docs.remove(&doc_id);
        true
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.keys().copied()
    }

    fn remove_field(&mut self, doc_id: DocId, field: &str) {
        let Some(old) = self.docs.get_mut(&doc_id).and_then(|f| f.remove(field)) else {
            return;
        };
        let Some(stats) = self.fields.get_mut(field) else {
            return;
        };
        for entry in old {
            if let Some(df) = stats.doc_freq.get_mut(&entry.term) {
                *df -= 1;
                if *df == 0 {
                    stats.doc_freq.remove(&entry.term);
                }
            }
            stats.total_tokens -= entry.frequency;
        }
    }
}

/// Group tokens by term, keeping offsets in token order.
pub fn term_vector(tokens: &[Token]) -> TermVector {
    let mut by_term: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for token in tokens {
        by_term.entry(token.term.as_str()).or_default().push(token.offset);
    }
    by_term
        .into_iter()
        .map(|(term, offsets)| TermVectorEntry {
            term: term.to_string(),
            frequency: offsets.len() as u64,
            offsets,
        })
        .collect()
}

impl Analyzer for MemoryCorpus {
    fn analyze(&self, analyzer: &str, field: &str, text: &str) -> RescoreResult<Vec<Token>> {
        self.analyzer.analyze(analyzer, field, text)
    }
}

impl CorpusStatistics for MemoryCorpus {
    fn document_frequency(&self, field: &str, term: &str) -> u64 {
        self.fields
            .get(field)
            .and_then(|s| s.doc_freq.get(term))
            .copied()
            .unwrap_or(0)
    }

    fn total_docs(&self) -> u64 {
        self.docs.len() as u64
    }

    fn avg_doc_length(&self, field: &str) -> f64 {
        let total = self.fields.get(field).map_or(0, |s| s.total_tokens);
        if self.docs.is_empty() {
            return 0.0;
        }
        total as f64 / self.docs.len() as f64
    }

    fn term_vector(&self, doc_id: DocId, field: &str) -> RescoreResult<TermVector> {
        self.docs
            .get(&doc_id)
            .and_then(|fields| fields.get(field))
            .cloned()
            .ok_or_else(|| RescoreError::MissingTermVector { doc_id, field: field.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryCorpus {
        let mut corpus = MemoryCorpus::new();
        corpus.add_document(1, "content", "term proximity test");
        corpus.add_document(2, "content", "term test term");
        corpus.add_document(3, "content", "unrelated");
        corpus
    }

    #[test]
    fn test_statistics() {
        let corpus = sample();
        assert_eq!(corpus.total_docs(), 3);
        assert_eq!(corpus.document_frequency("content", "term"), 2);
        assert_eq!(corpus.document_frequency("content", "proximity"), 1);
        assert_eq!(corpus.document_frequency("content", "missing"), 0);
        assert_eq!(corpus.document_frequency("title", "term"), 0);
        assert!((corpus.avg_doc_length("content") - 7.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_term_vector_groups_offsets() {
        let vector = sample().term_vector(2, "content").unwrap();
        let term = vector.iter().find(|e| e.term == "term").unwrap();
        assert_eq!(term.frequency, 2);
        assert_eq!(term.offsets, vec![0, 10]);
    }

    #[test]
    fn test_missing_term_vector() {
        let err = sample().term_vector(42, "content").unwrap_err();
        assert!(matches!(err, RescoreError::MissingTermVector { doc_id: 42, .. }));
        let err = sample().term_vector(1, "title").unwrap_err();
        assert!(matches!(err, RescoreError::MissingTermVector { .. }));
    }

    #[test]
    fn test_replacing_a_field_updates_statistics() {
        let mut corpus = sample();
        corpus.add_document(2, "content", "proximity");
        assert_eq!(corpus.total_docs(), 3);
        assert_eq!(corpus.document_frequency("content", "term"), 1);
        assert_eq!(corpus.document_frequency("content", "proximity"), 2);
        assert!((corpus.avg_doc_length("content") - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_document() {
        let mut corpus = sample();
        assert!(corpus.remove_document(1));
        assert!(!corpus.remove_document(1));
        assert_eq!(corpus.total_docs(), 2);
        assert_eq!(corpus.document_frequency("content", "proximity"), 0);
        assert_eq!(corpus.doc_ids().collect::<Vec<_>>(), vec![2, 3]);
    }
}
