//! End-to-end rescoring against the in-memory corpus.

use bm25tp::{Hit, MemoryCorpus, RescoreConfig, RescoreError, Rescorer, SimpleAnalyzer, TopHits};

fn corpus(docs: &[(u64, &str)]) -> MemoryCorpus {
    let mut corpus = MemoryCorpus::new();
    for (id, text) in docs {
        corpus.add_document(*id, "content", text);
    }
    corpus
}

fn top(hits: &[(u64, f32)]) -> TopHits {
    TopHits::new(
        hits.len() as u64,
        hits.iter().map(|&(doc_id, score)| Hit { doc_id, score }).collect(),
    )
}

fn ids(hits: &[Hit]) -> Vec<u64> {
    hits.iter().map(|h| h.doc_id).collect()
}

// ── three-document corpus ───────────────────────────────────────

fn three_docs() -> MemoryCorpus {
    corpus(&[
        (1, "a test of term proximity"),
        (2, "term proximity test"),
        (3, "a quick brown fox"),
    ])
}

#[test]
fn test_exact_order_document_wins() {
    let corpus = three_docs();
    let rescorer = Rescorer::new(RescoreConfig::new("term proximity test", "content").with_window_size(3)).unwrap();
    // first pass preferred doc 1
    let out = rescorer
        .rescore(&top(&[(1, 1.2), (2, 1.0), (3, 0.8)]), &SimpleAnalyzer, &corpus)
        .unwrap();

    assert_eq!(ids(&out.hits), vec![2, 1]);
    assert!(out.hits.iter().all(|h| h.score > 0.0));
    assert_eq!(out.total_hits, 3);

    let order: Vec<u64> = out.documents.iter().map(|d| d.doc_id).collect();
    assert_eq!(order, vec![2, 1, 3]);
    assert!(!out.documents[2].eligible);
    assert_eq!(out.documents[2].final_score, -1.0);
    // both pairs of doc 2 mirror the query order
    assert!((out.documents[0].boost_multiplier - 2.4).abs() < 1e-9);
}

#[test]
fn test_ranking_is_stable_across_calls() {
    let corpus = three_docs();
    let rescorer = Rescorer::new(RescoreConfig::new("term proximity test", "content").with_window_size(3)).unwrap();
    let hits = top(&[(1, 1.2), (2, 1.0), (3, 0.8)]);
    let first = rescorer.rescore(&hits, &SimpleAnalyzer, &corpus).unwrap();
    for _ in 0..5 {
        assert_eq!(rescorer.rescore(&hits, &SimpleAnalyzer, &corpus).unwrap(), first);
    }
}

#[test]
fn test_all_negative_falls_back_to_top_document() {
    let corpus = corpus(&[(1, "xyz abc"), (2, "qqq www"), (3, "term")]);
    let rescorer = Rescorer::new(RescoreConfig::new("term", "content")).unwrap();
    let out = rescorer.rescore(&top(&[(1, 5.0), (2, 3.0)]), &SimpleAnalyzer, &corpus).unwrap();

    assert_eq!(out.hits, vec![Hit { doc_id: 1, score: -1.0 }]);
    assert!(out.documents.iter().all(|d| !d.eligible));
}

#[test]
fn test_missing_term_vector_ranks_last() {
    let corpus = three_docs();
    let rescorer = Rescorer::new(RescoreConfig::new("term proximity test", "content")).unwrap();
    // doc 99 is not in the corpus but has the best first-pass score
    let out = rescorer
        .rescore(&top(&[(99, 9.0), (2, 1.0), (1, 0.5)]), &SimpleAnalyzer, &corpus)
        .unwrap();

    let last = out.documents.last().unwrap();
    assert_eq!(last.doc_id, 99);
    assert!(!last.eligible);
    assert_eq!(last.final_score, -1.0);
    assert_eq!(ids(&out.hits), vec![2, 1]);
}

// ── ordering and decay ──────────────────────────────────────────

#[test]
fn test_pass1_ties_keep_first_pass_order() {
    let corpus = corpus(&[(4, "rust search"), (5, "rust search"), (6, "other")]);
    let rescorer = Rescorer::new(RescoreConfig::new("rust search", "content")).unwrap();
    let out = rescorer.rescore(&top(&[(5, 1.0), (4, 1.0)]), &SimpleAnalyzer, &corpus).unwrap();

    let five = out.documents.iter().find(|d| d.doc_id == 5).unwrap();
    let four = out.documents.iter().find(|d| d.doc_id == 4).unwrap();
    assert_eq!(five.rank_pass1, 0);
    assert_eq!(four.rank_pass1, 1);
    assert_eq!(ids(&out.hits), vec![5, 4]);
}

#[test]
fn test_decay_lowers_bm25_of_later_duplicate() {
    let corpus = corpus(&[(1, "rust"), (2, "rust"), (3, "go")]);
    let rescorer = Rescorer::new(RescoreConfig::new("rust", "content").with_decay(0.8)).unwrap();
    let out = rescorer.rescore(&top(&[(1, 1.0), (2, 1.0)]), &SimpleAnalyzer, &corpus).unwrap();

    let (first, second) = (&out.documents[0], &out.documents[1]);
    assert_eq!(first.doc_id, 1);
    assert!(second.bm25_decayed < first.bm25_decayed);
    let ratio = second.bm25_decayed / first.bm25_decayed;
    assert!((ratio - (-0.8f64).exp()).abs() < 1e-6);
}

#[test]
fn test_decay_can_reorder_final_ranking() {
    // docs 1 and 2 credit the same rare term; doc 3 credits a commoner one
    let corpus = corpus(&[(1, "alpha"), (2, "alpha"), (3, "beta"), (4, "beta"), (5, "beta")]);
    let hits = top(&[(1, 1.0), (2, 1.0), (3, 1.0)]);

    let plain = Rescorer::new(RescoreConfig::new("alpha beta", "content"))
        .unwrap()
        .rescore(&hits, &SimpleAnalyzer, &corpus)
        .unwrap();
    let decayed = Rescorer::new(RescoreConfig::new("alpha beta", "content").with_decay(5.0))
        .unwrap()
        .rescore(&hits, &SimpleAnalyzer, &corpus)
        .unwrap();

    assert_eq!(ids(&plain.hits), vec![1, 2, 3]);
    assert_eq!(ids(&decayed.hits), vec![1, 3, 2]);
}

// ── configuration ───────────────────────────────────────────────

#[test]
fn test_rescorer_from_json_request() {
    let corpus = three_docs();
    let rescorer = Rescorer::from_json(
        r#"{"query": "term proximity test", "factor_field": "content", "window_size": 2}"#,
    )
    .unwrap();
    let out = rescorer
        .rescore(&top(&[(1, 1.2), (2, 1.0), (3, 0.8)]), &SimpleAnalyzer, &corpus)
        .unwrap();
    assert_eq!(out.documents.len(), 2);
    assert_eq!(out.total_hits, 3);
}

#[test]
fn test_unknown_field_has_no_term_vectors() {
    let corpus = three_docs();
    let rescorer = Rescorer::new(RescoreConfig::new("term proximity", "title")).unwrap();
    let out = rescorer.rescore(&top(&[(1, 1.0), (2, 2.0)]), &SimpleAnalyzer, &corpus).unwrap();
    // every document degrades; the top first-pass document is still returned
    assert_eq!(out.hits, vec![Hit { doc_id: 1, score: -1.0 }]);
}

#[test]
fn test_empty_corpus_aborts() {
    let rescorer = Rescorer::new(RescoreConfig::new("term", "content")).unwrap();
    let err = rescorer
        .rescore(&top(&[(1, 1.0)]), &SimpleAnalyzer, &MemoryCorpus::new())
        .unwrap_err();
    assert!(matches!(err, RescoreError::EmptyCorpus));
}

#[test]
fn test_explanation_serializes() {
    let corpus = three_docs();
    let rescorer = Rescorer::new(RescoreConfig::new("term proximity test", "content")).unwrap();
    let out = rescorer.rescore(&top(&[(2, 1.0)]), &SimpleAnalyzer, &corpus).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["documents"][0]["doc_id"], 2);
    assert_eq!(json["documents"][0]["rank_pass1"], 0);
    assert!(json["documents"][0]["proximity_no_decay"].as_f64().unwrap() > 0.0);
    assert_eq!(out.into_top_hits().hits.len(), 1);
}
