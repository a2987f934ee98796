//! Boolean query evaluation over a finished index.
//!
//! The query surface is fixed: one operator, AND or OR, applied uniformly
//! across a list of terms. Evaluation reads postings lists through
//! [`InvertedIndex::lookup`] and never mutates the index, so any number of
//! queries may run against one index concurrently.

use crate::error::QueryError;
use crate::index::{DocId, InvertedIndex, Posting};
use std::collections::BTreeMap;

/// The two boolean operators the query surface recognizes. A closed
/// variant, so operator handling is exhaustiveness-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    /// Parse the textual operator. Exactly `AND` and `OR` are accepted.
    pub fn parse(s: &str) -> Result<Self, QueryError> {
        match s {
            "AND" => Ok(BooleanOp::And),
            "OR" => Ok(BooleanOp::Or),
            other => Err(QueryError::InvalidOperator(other.to_string())),
        }
    }
}

/// A validated boolean query: an operator and at least one term. Terms are
/// expected to be normalized by the same tokenizer that fed the index.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    op: BooleanOp,
    terms: Vec<String>,
}

impl BooleanQuery {
    pub fn new(op: BooleanOp, terms: Vec<String>) -> Result<Self, QueryError> {
        if terms.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        Ok(Self { op, terms })
    }

    pub fn op(&self) -> BooleanOp {
        self.op
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// One matching document with its per-query-term frequencies, parallel to
/// the query's term list; a zero means the term is absent from the
/// document. AND candidates have every entry non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub doc_id: DocId,
    pub term_tfs: Vec<u32>,
}

/// Evaluate a query, returning candidates sorted ascending by document ID.
/// A single-term query returns that term's document set under either
/// operator.
pub fn evaluate(index: &InvertedIndex, query: &BooleanQuery) -> Vec<Candidate> {
    match query.op {
        BooleanOp::And => conjunction(index, &query.terms),
        BooleanOp::Or => disjunction(index, &query.terms),
    }
}

fn conjunction(index: &InvertedIndex, terms: &[String]) -> Vec<Candidate> {
    let mut lists: Vec<&[Posting]> = Vec::with_capacity(terms.len());
    for term in terms {
        let postings = index.lookup(term);
        if postings.is_empty() {
            // A term outside the vocabulary matches nothing at all.
            return Vec::new();
        }
        lists.push(postings);
    }

    // Intersect in ascending document-frequency order: the smallest list
    // prunes the candidate set fastest.
    let mut by_df = lists.clone();
    by_df.sort_unstable_by_key(|postings| postings.len());

    let mut docs: Vec<DocId> = by_df[0].iter().map(|p| p.doc_id).collect();
    for postings in &by_df[1..] {
        docs = intersect(&docs, postings);
        if docs.is_empty() {
            break;
        }
    }

    docs.into_iter()
        .map(|doc_id| Candidate {
            doc_id,
            term_tfs: lists.iter().map(|postings| tf_of(postings, doc_id)).collect(),
        })
        .collect()
}

/// Two-pointer merge intersection of a sorted doc-ID list with a sorted
/// postings list.
fn intersect(docs: &[DocId], postings: &[Posting]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(docs.len().min(postings.len()));
    let mut i = 0;
    let mut j = 0;
    while i < docs.len() && j < postings.len() {
        match docs[i].cmp(&postings[j].doc_id) {
            std::cmp::Ordering::Equal => {
                out.push(docs[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    out
}

fn tf_of(postings: &[Posting], doc_id: DocId) -> u32 {
    postings
        .binary_search_by_key(&doc_id, |p| p.doc_id)
        .map(|i| postings[i].tf)
        .unwrap_or(0)
}

fn disjunction(index: &InvertedIndex, terms: &[String]) -> Vec<Candidate> {
    let mut acc: BTreeMap<DocId, Vec<u32>> = BTreeMap::new();
    for (i, term) in terms.iter().enumerate() {
        // An unknown term contributes nothing to the union.
        for posting in index.lookup(term) {
            acc.entry(posting.doc_id).or_insert_with(|| vec![0; terms.len()])[i] = posting.tf;
        }
    }
    acc.into_iter()
        .map(|(doc_id, term_tfs)| Candidate { doc_id, term_tfs })
        .collect()
}
