//! Naive single-pass in-memory index construction.
//!
//! Every (term, document) occurrence is materialized as a pair, the pair
//! list is sorted once at the end, and runs of equal pairs collapse into
//! postings with summed term frequency. Memory cost is proportional to the
//! total token count of the corpus; this is the baseline the SPIMI builder
//! is measured against, and running out of memory here is the expected,
//! instructive outcome on corpora that exceed the budget.

use crate::error::BuildError;
use crate::index::{DocId, InvertedIndex, Posting};
use crate::{BuildStats, TokenizedDoc};
use std::mem;

#[derive(Debug, Clone, Default)]
pub struct NaiveConfig {
    /// Budget for the builder's estimated working set. `None` builds
    /// unbounded, leaving the process at the mercy of the machine.
    pub memory_budget: Option<u64>,
    /// When set, a stream yielding fewer documents fails the build.
    pub expected_docs: Option<u32>,
}

/// Estimated bytes one materialized pair costs: the heap text plus the
/// pair's own footprint in the vector.
fn pair_footprint(term: &str) -> u64 {
    (term.len() + mem::size_of::<(String, DocId)>()) as u64
}

pub fn build_naive<I>(docs: I, cfg: &NaiveConfig) -> Result<(InvertedIndex, BuildStats), BuildError>
where
    I: IntoIterator<Item = TokenizedDoc>,
{
    let mut index = InvertedIndex::new();
    let mut pairs: Vec<(String, DocId)> = Vec::new();
    let mut estimated: u64 = 0;
    let mut last_doc: Option<DocId> = None;
    let mut doc_count: u32 = 0;

    for doc in docs {
        if last_doc.is_some_and(|last| doc.doc_id <= last) {
            return Err(BuildError::CorpusOutOfOrder { doc_id: doc.doc_id });
        }
        last_doc = Some(doc.doc_id);
        index.record_doc(doc.doc_id, doc.terms.len() as u32);
        doc_count += 1;

        for term in doc.terms {
            estimated += pair_footprint(&term);
            if let Some(budget) = cfg.memory_budget {
                if estimated > budget {
                    return Err(BuildError::OutOfMemory { budget, required: estimated });
                }
            }
            pairs.push((term, doc.doc_id));
        }
    }

    if let Some(expected) = cfg.expected_docs {
        if doc_count < expected {
            return Err(BuildError::CorpusExhaustedEarly { expected, actual: doc_count });
        }
    }

    tracing::debug!(doc_count, pair_count = pairs.len(), "sorting term-document pairs");
    pairs.sort_unstable();

    // Collapse sorted runs: equal (term, doc) pairs sum into one posting,
    // a term change flushes the finished postings list.
    let mut cur_term: Option<String> = None;
    let mut cur_postings: Vec<Posting> = Vec::new();
    for (term, doc_id) in pairs {
        if cur_term.as_deref() != Some(term.as_str()) {
            if let Some(done) = cur_term.take() {
                index.insert_merged(done, mem::take(&mut cur_postings));
            }
            cur_term = Some(term);
            cur_postings.push(Posting { doc_id, tf: 1 });
            continue;
        }
        match cur_postings.last_mut() {
            Some(last) if last.doc_id == doc_id => last.tf += 1,
            _ => cur_postings.push(Posting { doc_id, tf: 1 }),
        }
    }
    if let Some(done) = cur_term.take() {
        index.insert_merged(done, cur_postings);
    }

    let stats = BuildStats {
        doc_count,
        term_count: index.num_terms(),
        postings_count: index.num_postings(),
        peak_memory_bytes: estimated,
        block_count: 0,
    };
    tracing::info!(
        doc_count,
        terms = stats.term_count,
        postings = stats.postings_count,
        "naive index built"
    );
    Ok((index, stats))
}
