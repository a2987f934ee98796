//! Inverted-index construction and boolean retrieval over a fixed corpus.
//!
//! Two builders produce the same logical [`InvertedIndex`]: [`build_naive`]
//! materializes every (term, document) pair in memory, [`build_spimi`]
//! bounds peak memory with block spilling and an external k-way merge.
//! [`evaluate`] answers AND/OR boolean queries against the finished index
//! and [`rank`] orders the matches.

pub mod error;
pub mod index;
pub mod naive;
pub mod persist;
pub mod query;
pub mod rank;
pub mod spimi;
pub mod tokenizer;

pub use error::{BuildError, QueryError};
pub use index::{DocId, InvertedIndex, Posting};
pub use naive::{build_naive, NaiveConfig};
pub use query::{evaluate, BooleanOp, BooleanQuery, Candidate};
pub use rank::{rank, Bm25Params, Ranking, ScoredDoc};
pub use spimi::{build_spimi, SpimiConfig};

/// One document as delivered by the tokenizer collaborator: a stable ID and
/// the normalized terms in document order. Builders consume streams of these
/// and never see raw corpus markup. Document IDs must be strictly ascending
/// within a stream.
#[derive(Debug, Clone)]
pub struct TokenizedDoc {
    pub doc_id: DocId,
    pub terms: Vec<String>,
}

/// Construction counters handed back to the surrounding tooling. Wall-clock
/// time is measured by the caller around the build, not in here.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    pub doc_count: u32,
    pub term_count: usize,
    pub postings_count: u64,
    /// Estimated peak footprint of the builder's working state, in bytes.
    pub peak_memory_bytes: u64,
    /// Number of blocks spilled to disk. Always zero for the naive builder.
    pub block_count: u32,
}
