//! BM25TP - term-proximity rescoring for lexical search
//!
//! Re-ranks a window of first-pass BM25 candidates using term proximity,
//! character adjacency around exact matches, and a rank-ordered decay that
//! stops repeated terms from earning full credit in every document.
//!
//! The engine reads text analysis and corpus statistics through the
//! `Analyzer` and `CorpusStatistics` traits. `SimpleAnalyzer` and
//! `MemoryCorpus` implement them in process; `Indexer` implements both
//! over a Tantivy index and also provides the first-pass search.

pub mod adjacency;
pub mod analysis;
pub mod bm25;
pub(crate) mod candidate;
pub mod config;
pub mod corpus;
pub mod coverage;
pub mod decay;
pub mod indexer;
pub mod interface;
pub mod proximity;
pub mod rescorer;
pub mod term_index;

pub use analysis::SimpleAnalyzer;
pub use config::RescoreConfig;
pub use corpus::MemoryCorpus;
pub use indexer::{Indexer, IndexerError, IndexerResult};
pub use interface::*;
pub use rescorer::{RescoreOutput, RescoredDocument, Rescorer};
