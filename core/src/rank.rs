//! Relevance ranking of query candidates.
//!
//! The weighting scheme is Okapi BM25 with `idf = ln(N / df)`: per-term
//! contributions `idf * tf*(k1+1) / (k1*((1-b) + b*dl/avgdl) + tf)` are
//! summed per document. A simpler match-count mode scores a document by how
//! many distinct query terms it contains. Either way the output ordering is
//! deterministic: strictly descending by score, ascending document ID
//! within ties.

use crate::index::{DocId, InvertedIndex};
use crate::query::Candidate;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation, k1 >= 0.
    pub k1: f32,
    /// Length normalization strength, 0 <= b <= 1.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ranking {
    Bm25(Bm25Params),
    /// Score is the number of distinct query terms present in the document.
    MatchCount,
}

impl Ranking {
    /// BM25 with the default parameters.
    pub fn default_bm25() -> Self {
        Ranking::Bm25(Bm25Params::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

/// Score and order candidates. `terms` is the query's term list; each
/// candidate's `term_tfs` is parallel to it.
pub fn rank(
    index: &InvertedIndex,
    terms: &[String],
    candidates: &[Candidate],
    ranking: &Ranking,
) -> Vec<ScoredDoc> {
    let mut scored = match ranking {
        Ranking::Bm25(params) => bm25(index, terms, candidates, params),
        Ranking::MatchCount => candidates
            .iter()
            .map(|c| ScoredDoc {
                doc_id: c.doc_id,
                score: c.term_tfs.iter().filter(|&&tf| tf > 0).count() as f32,
            })
            .collect(),
    };
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    scored
}

fn bm25(
    index: &InvertedIndex,
    terms: &[String],
    candidates: &[Candidate],
    params: &Bm25Params,
) -> Vec<ScoredDoc> {
    let n = index.corpus_size() as f32;
    let avgdl = index.avg_doc_length().max(f32::MIN_POSITIVE);
    let idfs: Vec<f32> = terms
        .iter()
        .map(|term| {
            let df = index.document_frequency(term) as f32;
            if df > 0.0 { (n / df).ln() } else { 0.0 }
        })
        .collect();

    candidates
        .iter()
        .map(|c| {
            let dl = index.doc_length(c.doc_id) as f32;
            let mut score = 0.0;
            for (idf, &tf) in idfs.iter().zip(&c.term_tfs) {
                if tf == 0 {
                    continue;
                }
                let tf = tf as f32;
                let norm = params.k1 * ((1.0 - params.b) + params.b * dl / avgdl) + tf;
                score += idf * (tf * (params.k1 + 1.0)) / norm;
            }
            ScoredDoc { doc_id: c.doc_id, score }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_scores_break_ties_by_doc_id() {
        let index = InvertedIndex::new();
        let candidates = vec![
            Candidate { doc_id: 9, term_tfs: vec![1] },
            Candidate { doc_id: 3, term_tfs: vec![1] },
            Candidate { doc_id: 5, term_tfs: vec![1] },
        ];
        let ranked = rank(&index, &["cat".into()], &candidates, &Ranking::MatchCount);
        let ids: Vec<DocId> = ranked.iter().map(|s| s.doc_id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }
}
