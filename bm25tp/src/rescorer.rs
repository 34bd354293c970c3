//! Two-pass rescoring of a first-pass candidate window.
//!
//! Extraction and pass 1 have no shared mutable state and run on rayon.
//! Pass 2 threads one `DecayState` through the documents in pass-1 order and
//! is sequential: reordering it changes the scores.

use crate::adjacency::AdjacentCharScorer;
use crate::bm25::{idf, Bm25Scorer, IdfTable};
use crate::candidate::CandidateDocument;
use crate::config::RescoreConfig;
use crate::coverage::{CharCoverageGate, INELIGIBLE_SCORE};
use crate::decay::DecayState;
use crate::interface::{
    Analyzer, CorpusStatistics, DocId, Hit, RescoreError, RescoreResult, TopHits,
};
use crate::proximity::ProximityScorer;
use crate::term_index::{TermPositionIndex, QUERY_PAD};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, trace, warn};
use validator::Validate;

/// Score breakdown for one document of the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoredDocument {
    pub doc_id: DocId,
    pub base_score: f32,
    pub rank_original: usize,
    pub eligible: bool,
    pub coverage_ratio: f64,
    pub proximity_no_decay: f64,
    pub char_adjacency: f64,
    pub combined_no_decay: f64,
    pub rank_pass1: usize,
    pub proximity_decayed: f64,
    pub bm25_decayed: f64,
    pub boost_multiplier: f64,
    pub final_score: f32,
    pub rank_final: usize,
}

/// Rescored hits, plus every window document in final order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoreOutput {
    /// Passed through unchanged from the first-pass result.
    pub total_hits: u64,
    pub hits: Vec<Hit>,
    pub documents: Vec<RescoredDocument>,
}

impl RescoreOutput {
    pub fn into_top_hits(self) -> TopHits {
        TopHits::new(self.total_hits, self.hits)
    }
}

/// Query-side state shared by every document of one call.
struct QueryContext {
    terms: TermPositionIndex,
    idf: IdfTable,
    total_docs: u64,
    avg_doc_len: f64,
}

struct FirstPass {
    doc: CandidateDocument,
    proximity: f64,
    adjacency: f64,
    combined: f64,
}

#[derive(Debug, Clone)]
pub struct Rescorer {
    config: RescoreConfig,
    proximity: ProximityScorer,
    adjacency: AdjacentCharScorer,
    bm25: Bm25Scorer,
}

impl Rescorer {
    pub fn new(config: RescoreConfig) -> RescoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            proximity: ProximityScorer,
            adjacency: AdjacentCharScorer::default(),
            bm25: Bm25Scorer::default(),
        })
    }

    pub fn from_json(json: &str) -> RescoreResult<Self> {
        Self::new(RescoreConfig::from_json(json)?)
    }

    pub fn config(&self) -> &RescoreConfig {
        &self.config
    }

    /// Rescore the top `window_size` hits of `top`.
    ///
    /// Fails only on query analysis or an empty corpus. A document whose
    /// term vector is missing is kept, ineligible, and sorts last.
    pub fn rescore<A, C>(&self, top: &TopHits, analyzer: &A, corpus: &C) -> RescoreResult<RescoreOutput>
    where
        A: Analyzer + ?Sized,
        C: CorpusStatistics + ?Sized,
    {
        let start = Instant::now();
        let field = self.config.factor_field.as_str();
        let ctx = self.query_context(analyzer, corpus)?;

        let window = top.hits.len().min(self.config.window_size as usize);
        let gate = CharCoverageGate::new(&self.config.query);
        let candidates = top.hits[..window]
            .par_iter()
            .enumerate()
            .map(|(rank, hit)| match corpus.term_vector(hit.doc_id, field) {
                Ok(vector) => Ok(CandidateDocument::extract(hit, rank, &vector, &ctx.terms, &gate)),
                Err(RescoreError::MissingTermVector { doc_id, field }) => {
                    warn!(doc_id, field = %field, "no term vector, document ranked last");
                    Ok(CandidateDocument::missing(hit, rank))
                }
                Err(e) => Err(e),
            })
            .collect::<RescoreResult<Vec<_>>>()?;

        let doc_idf = |term: &str| idf(ctx.total_docs, corpus.document_frequency(field, term));
        let mut ranked: Vec<FirstPass> = candidates
            .into_par_iter()
            .map(|doc| self.first_pass(doc, &ctx, &doc_idf))
            .collect();
        ranked.sort_by(|a, b| {
            b.combined
                .partial_cmp(&a.combined)
                .unwrap_or(Ordering::Equal)
                .then(a.doc.rank_original().cmp(&b.doc.rank_original()))
        });
        debug!(
            window,
            eligible = ranked.iter().filter(|r| r.doc.is_eligible()).count(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "pass 1 complete"
        );

        let (_, mut documents) = ranked.into_iter().enumerate().fold(
            (DecayState::new(self.config.decay), Vec::with_capacity(window)),
            |(mut decay, mut documents), (rank_pass1, first)| {
                documents.push(self.second_pass(first, rank_pass1, &ctx, &mut decay));
                (decay, documents)
            },
        );
        documents.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(Ordering::Equal));
        for (rank, doc) in documents.iter_mut().enumerate() {
            doc.rank_final = rank;
        }

        let mut hits: Vec<Hit> = documents
            .iter()
            .filter(|d| d.final_score > 0.0)
            .map(|d| Hit { doc_id: d.doc_id, score: d.final_score })
            .collect();
        if hits.is_empty() {
            if let Some(top_doc) = documents.first() {
                hits.push(Hit { doc_id: top_doc.doc_id, score: top_doc.final_score });
            }
        }

        debug!(
            window,
            returned = hits.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "rescore complete"
        );
        Ok(RescoreOutput { total_hits: top.total_hits, hits, documents })
    }

    fn query_context<A, C>(&self, analyzer: &A, corpus: &C) -> RescoreResult<QueryContext>
    where
        A: Analyzer + ?Sized,
        C: CorpusStatistics + ?Sized,
    {
        let field = self.config.factor_field.as_str();
        let tokens = analyzer.analyze(&self.config.analyzer, field, &self.config.query)?;
        let terms = TermPositionIndex::from_tokens(&tokens, QUERY_PAD).map_err(|_| RescoreError::Analysis {
            text: self.config.query.clone(),
            reason: "query produced no terms".to_string(),
        })?;

        let total_docs = corpus.total_docs();
        if total_docs == 0 {
            return Err(RescoreError::EmptyCorpus);
        }
        let idf = IdfTable::for_query(&terms, total_docs, |t| corpus.document_frequency(field, t));
        let avg_doc_len = corpus.avg_doc_length(field);
        debug!(
            query = %self.config.query,
            terms = terms.len(),
            distinct = idf.len(),
            total_docs,
            avg_doc_len,
            "query analyzed"
        );
        Ok(QueryContext { terms, idf, total_docs, avg_doc_len })
    }

    fn first_pass<F>(&self, doc: CandidateDocument, ctx: &QueryContext, doc_idf: &F) -> FirstPass
    where
        F: Fn(&str) -> f64,
    {
        let scores = doc.terms().filter(|_| doc.is_eligible()).map(|terms| {
            let proximity = self.proximity.score(terms, &ctx.terms, &ctx.idf, ctx.avg_doc_len, None).score;
            (proximity, self.adjacency.score(terms, &ctx.terms, doc_idf))
        });
        let Some((proximity, adjacency)) = scores else {
            return FirstPass { doc, proximity: 0.0, adjacency: 0.0, combined: INELIGIBLE_SCORE };
        };
        let combined = proximity + adjacency + f64::from(doc.base_score());
        FirstPass { doc, proximity, adjacency, combined }
    }

    fn second_pass(
        &self,
        first: FirstPass,
        rank_pass1: usize,
        ctx: &QueryContext,
        decay: &mut DecayState,
    ) -> RescoredDocument {
        let FirstPass { doc, proximity, adjacency, combined } = first;
        let mut rescored = RescoredDocument {
            doc_id: doc.doc_id(),
            base_score: doc.base_score(),
            rank_original: doc.rank_original(),
            eligible: doc.is_eligible(),
            coverage_ratio: doc.coverage().ratio(),
            proximity_no_decay: proximity,
            char_adjacency: adjacency,
            combined_no_decay: combined,
            rank_pass1,
            proximity_decayed: 0.0,
            bm25_decayed: 0.0,
            boost_multiplier: 0.0,
            final_score: INELIGIBLE_SCORE as f32,
            rank_final: 0,
        };
        let Some(terms) = doc.terms().filter(|_| doc.is_eligible()) else {
            trace!(doc_id = doc.doc_id(), rank_pass1, "ineligible");
            return rescored;
        };

        let proximity = self.proximity.score(terms, &ctx.terms, &ctx.idf, ctx.avg_doc_len, Some(&*decay));
        let bm25 = self.bm25.score(
            doc.occurrences(),
            ctx.avg_doc_len,
            doc.term_freq(),
            &ctx.terms,
            &ctx.idf,
            Some(decay),
        );
        rescored.proximity_decayed = proximity.score;
        rescored.bm25_decayed = bm25;
        rescored.boost_multiplier = proximity.boost;
        rescored.final_score = (proximity.score + adjacency + bm25) as f32;
        trace!(
            doc_id = rescored.doc_id,
            rank_pass1,
            proximity = proximity.score,
            adjacency,
            bm25,
            final_score = rescored.final_score,
            "pass 2"
        );
        rescored
    }
}
