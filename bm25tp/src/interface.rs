//! Rescorer Interface Definition
//!
//! Shared records passed between the engine and its collaborators, the two
//! collaborator traits, and the crate-wide error type. The engine never
//! tokenizes text or reads an index itself; it goes through `Analyzer` and
//! `CorpusStatistics`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document identifier as assigned by the corpus.
pub type DocId = u64;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One analyzed token: the normalized term and its character start offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub term: String,
    pub offset: usize,
}

impl Token {
    pub fn new(term: impl Into<String>, offset: usize) -> Self {
        Self { term: term.into(), offset }
    }
}

/// Per-document statistics for a single term.
///
/// `frequency` is the term's total frequency in the document; `offsets` holds
/// the character start offset of every occurrence the index kept positions
/// for (it may be shorter than `frequency`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermVectorEntry {
    pub term: String,
    pub frequency: u64,
    pub offsets: Vec<usize>,
}

/// A document's term vector for one field.
pub type TermVector = Vec<TermVectorEntry>;

/// A scored document from first-pass retrieval, or from the rescorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f32,
}

/// Ranked hits plus the total number of matches the retrieval step saw.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopHits {
    pub total_hits: u64,
    pub hits: Vec<Hit>,
}

impl TopHits {
    pub fn new(total_hits: u64, hits: Vec<Hit>) -> Self {
        Self { total_hits, hits }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for rescoring operations
#[derive(Debug, Error)]
pub enum RescoreError {
    #[error("text [{text}] can not be analyzed: {reason}")]
    Analysis { text: String, reason: String },
    #[error("corpus contains no documents")]
    EmptyCorpus,
    #[error("no term vector for document {doc_id} in field [{field}]")]
    MissingTermVector { doc_id: DocId, field: String },
    #[error("text produced no tokens")]
    EmptyText,
    #[error("invalid rescore configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),
    #[error("malformed rescore configuration: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    #[error("index error: {0}")]
    Index(String),
}

pub type RescoreResult<T> = Result<T, RescoreError>;

impl From<crate::indexer::IndexerError> for RescoreError {
    fn from(e: crate::indexer::IndexerError) -> Self {
        RescoreError::Index(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Text analysis: turns raw text into `(term, char offset)` tokens.
///
/// Implementations must be deterministic: the same analyzer, field and text
/// always produce the same sequence.
pub trait Analyzer: Sync {
    fn analyze(&self, analyzer: &str, field: &str, text: &str) -> RescoreResult<Vec<Token>>;
}

/// Read-only corpus statistics for the duration of one rescore call.
pub trait CorpusStatistics: Sync {
    /// Number of documents whose `field` contains `term`.
    fn document_frequency(&self, field: &str, term: &str) -> u64;

    /// Number of documents in the corpus.
    fn total_docs(&self) -> u64;

    /// Average number of tokens per document in `field`.
    fn avg_doc_length(&self, field: &str) -> f64;

    /// Term vector of `doc_id` for `field`, or `MissingTermVector`.
    fn term_vector(&self, doc_id: DocId, field: &str) -> RescoreResult<TermVector>;
}
