//! Tantivy-backed first-pass retrieval and corpus statistics.
//!
//! Every text field is indexed with the `unigram` tokenizer (word runs plus
//! single CJK characters, lowercased) with frequencies and positions, and
//! stored so term vectors can be rebuilt by re-analysis at rescore time.
//! Documents are keyed by a `u64` id with upsert semantics.

use crate::analysis::{segment_words, CharOffsets, Segment};
use crate::config::DEFAULT_ANALYZER;
use crate::corpus::term_vector;
use crate::interface::{
    Analyzer, CorpusStatistics, DocId, Hit, RescoreError, RescoreResult, TermVector, Token, TopHits,
};
use parking_lot::RwLock;
use std::path::Path;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{QueryParser, TermQuery};
use tantivy::schema::*;
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, TokenStream, Tokenizer};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, Term};
use thiserror::Error;
use tracing::{debug, warn};

/// Name the segmenting tokenizer is registered under.
pub const UNIGRAM_TOKENIZER: &str = "unigram";

const ID_FIELD: &str = "id";

/// Splits text with `segment_words`; lowercasing is left to `LowerCaser`.
#[derive(Clone, Default)]
pub struct UnigramTokenizer;

impl Tokenizer for UnigramTokenizer {
    type TokenStream<'a> = UnigramTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        UnigramTokenStream {
            text,
            segments: segment_words(text).into_iter(),
            token: tantivy::tokenizer::Token::default(),
        }
    }
}

pub struct UnigramTokenStream<'a> {
    text: &'a str,
    segments: std::vec::IntoIter<Segment>,
    token: tantivy::tokenizer::Token,
}

impl TokenStream for UnigramTokenStream<'_> {
    fn advance(&mut self) -> bool {
        let Some(segment) = self.segments.next() else {
            return false;
        };
        self.token.text.clear();
        self.token.text.push_str(&self.text[segment.byte_start..segment.byte_end]);
        self.token.offset_from = segment.byte_start;
        self.token.offset_to = segment.byte_end;
        self.token.position = self.token.position.wrapping_add(1);
        true
    }

    fn token(&self) -> &tantivy::tokenizer::Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut tantivy::tokenizer::Token {
        &mut self.token
    }
}

/// Error type for indexer operations
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("Directory error: {0}")]
    Directory(#[from] tantivy::directory::error::OpenDirectoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown field [{0}]")]
    UnknownField(String),
}

pub type IndexerResult<T> = Result<T, IndexerError>;

/// Tantivy index over `u64`-keyed documents with named text fields.
pub struct Indexer {
    index: Index,
    writer: RwLock<IndexWriter>,
    reader: RwLock<IndexReader>,
    schema: Schema,
    id_field: Field,
}

impl Indexer {
    /// Open the index at `path`, creating it with `fields` if absent.
    pub fn open_or_create(path: &Path, fields: &[&str]) -> IndexerResult<Self> {
        std::fs::create_dir_all(path)?;
        let dir = MmapDirectory::open(path)?;
        let index = Index::open_or_create(dir, Self::build_schema(fields))?;
        Self::from_index(index, 50_000_000)
    }

    /// Open an existing index; its text fields come from the stored schema.
    pub fn open(path: &Path) -> IndexerResult<Self> {
        let dir = MmapDirectory::open(path)?;
        let index = Index::open(dir)?;
        Self::from_index(index, 50_000_000)
    }

    pub fn in_memory(fields: &[&str]) -> IndexerResult<Self> {
        let index = Index::create_in_ram(Self::build_schema(fields));
        Self::from_index(index, 15_000_000)
    }

    fn from_index(index: Index, heap_bytes: usize) -> IndexerResult<Self> {
        Self::register_tokenizer(&index);
        let schema = index.schema();
        let id_field = schema
            .get_field(ID_FIELD)
            .map_err(|_| IndexerError::UnknownField(ID_FIELD.to_string()))?;
        let writer = index.writer(heap_bytes)?;
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        Ok(Self {
            index,
            writer: RwLock::new(writer),
            reader: RwLock::new(reader),
            schema,
            id_field,
        })
    }

    fn build_schema(fields: &[&str]) -> Schema {
        let mut builder = Schema::builder();
        builder.add_u64_field(ID_FIELD, STORED | FAST | INDEXED);

        let indexing = TextFieldIndexing::default()
            .set_tokenizer(UNIGRAM_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let options = TextOptions::default().set_indexing_options(indexing).set_stored();
        for field in fields {
            builder.add_text_field(field, options.clone());
        }
        builder.build()
    }

    /// Tokenizers are not persisted with the index; register on every open.
    /// Registers `unigram`, and shadows Tantivy's `default` with it so the
    /// default request analyzer splits CJK text the way the fields do.
    fn register_tokenizer(index: &Index) {
        let tokenizer = TextAnalyzer::builder(UnigramTokenizer).filter(LowerCaser).build();
        index.tokenizers().register(UNIGRAM_TOKENIZER, tokenizer.clone());
        index.tokenizers().register(DEFAULT_ANALYZER, tokenizer);
    }

    /// Names of the indexed text fields.
    pub fn text_fields(&self) -> Vec<String> {
        self.schema
            .fields()
            .filter(|(_, entry)| matches!(entry.field_type(), FieldType::Str(_)))
            .map(|(_, entry)| entry.name().to_string())
            .collect()
    }

    fn field(&self, name: &str) -> IndexerResult<Field> {
        match self.schema.get_field(name) {
            Ok(field) if field != self.id_field => Ok(field),
            _ => Err(IndexerError::UnknownField(name.to_string())),
        }
    }

    /// Add or replace document `id`.
    pub fn add_document(&self, id: DocId, fields: &[(&str, &str)]) -> IndexerResult<()> {
        let mut doc = TantivyDocument::default();
        doc.add_u64(self.id_field, id);
        for (name, text) in fields {
            doc.add_text(self.field(name)?, text);
        }

        let writer = self.writer.read();
        writer.delete_term(Term::from_field_u64(self.id_field, id));
        writer.add_document(doc)?;
        Ok(())
    }

    pub fn delete_document(&self, id: DocId) -> IndexerResult<()> {
        let writer = self.writer.read();
        writer.delete_term(Term::from_field_u64(self.id_field, id));
        Ok(())
    }

    pub fn commit(&self) -> IndexerResult<()> {
        self.writer.write().commit()?;
        self.reader.write().reload()?;
        Ok(())
    }

    /// Get the number of documents in the index
    pub fn num_docs(&self) -> u64 {
        self.searcher().num_docs()
    }

    fn searcher(&self) -> Searcher {
        self.reader.read().searcher()
    }

    /// First-pass BM25 retrieval over one field.
    ///
    /// The query is parsed leniently: syntax errors are logged and the
    /// parsable remainder is searched.
    pub fn search(&self, field: &str, query: &str, limit: usize) -> IndexerResult<TopHits> {
        let field = self.field(field)?;
        let parser = QueryParser::for_index(&self.index, vec![field]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            warn!(query, errors = ?errors, "query parsed leniently");
        }

        let searcher = self.searcher();
        if limit == 0 {
            let total_hits = searcher.search(parsed.as_ref(), &Count)?;
            return Ok(TopHits::new(total_hits as u64, Vec::new()));
        }
        let (top_docs, total_hits) = searcher.search(parsed.as_ref(), &(TopDocs::with_limit(limit), Count))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some(doc_id) = doc.get_first(self.id_field).and_then(|v| v.as_u64()) else {
                continue;
            };
            hits.push(Hit { doc_id, score });
        }
        debug!(query, total_hits, returned = hits.len(), "first-pass search");
        Ok(TopHits::new(total_hits as u64, hits))
    }

    /// Stored text of `field` for document `id`, if both exist.
    pub fn stored_text(&self, id: DocId, field: &str) -> IndexerResult<Option<String>> {
        let field = self.field(field)?;
        let searcher = self.searcher();
        let query = TermQuery::new(Term::from_field_u64(self.id_field, id), IndexRecordOption::Basic);
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, address)) = top.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn tokenizer_for(&self, field: Field) -> Option<TextAnalyzer> {
        let FieldType::Str(options) = self.schema.get_field_entry(field).field_type() else {
            return None;
        };
        let name = options.get_indexing_options()?.tokenizer();
        self.index.tokenizers().get(name)
    }

    fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<Token> {
        let offsets = CharOffsets::new(text);
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(Token::new(token.text.clone(), offsets.char_offset(token.offset_from)));
        }
        tokens
    }

    fn doc_freq(&self, field: &str, term: &str) -> IndexerResult<u64> {
        let field = self.field(field)?;
        Ok(self.searcher().doc_freq(&Term::from_field_text(field, term))?)
    }

    fn total_tokens(&self, field: &str) -> IndexerResult<u64> {
        let field = self.field(field)?;
        let mut total = 0;
        for segment in self.searcher().segment_readers() {
            total += segment.inverted_index(field)?.total_num_tokens();
        }
        Ok(total)
    }
}

impl Analyzer for Indexer {
    /// Runs the named registered tokenizer. The field must be a text field
    /// of this index.
    fn analyze(&self, analyzer: &str, field: &str, text: &str) -> RescoreResult<Vec<Token>> {
        let analysis_error = |reason: String| RescoreError::Analysis { text: text.to_string(), reason };
        self.field(field).map_err(|e| analysis_error(e.to_string()))?;
        let mut tokenizer = self
            .index
            .tokenizers()
            .get(analyzer)
            .ok_or_else(|| analysis_error(format!("unknown analyzer [{analyzer}]")))?;
        Ok(Self::tokenize(&mut tokenizer, text))
    }
}

impl CorpusStatistics for Indexer {
    fn document_frequency(&self, field: &str, term: &str) -> u64 {
        self.doc_freq(field, term).unwrap_or_else(|e| {
            warn!(field, term, error = %e, "document frequency unavailable");
            0
        })
    }

    fn total_docs(&self) -> u64 {
        self.num_docs()
    }

    fn avg_doc_length(&self, field: &str) -> f64 {
        let num_docs = self.num_docs();
        if num_docs == 0 {
            return 0.0;
        }
        match self.total_tokens(field) {
            Ok(total) => total as f64 / num_docs as f64,
            Err(e) => {
                warn!(field, error = %e, "token count unavailable");
                0.0
            }
        }
    }

    /// Rebuilt by re-analyzing the stored text with the field's tokenizer.
    fn term_vector(&self, doc_id: DocId, field: &str) -> RescoreResult<TermVector> {
        let missing = || RescoreError::MissingTermVector { doc_id, field: field.to_string() };
        let Some(text) = self.stored_text(doc_id, field)? else {
            return Err(missing());
        };
        let mut tokenizer = self.field(field).ok().and_then(|f| self.tokenizer_for(f)).ok_or_else(missing)?;
        Ok(term_vector(&Self::tokenize(&mut tokenizer, &text)))
    }
}
