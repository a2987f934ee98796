use crate::DocId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while constructing an index. Any of these aborts the whole
/// build; no partial index is ever handed to the query layer.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The tokenizer stream ended before the configured document count.
    #[error("corpus exhausted early: expected {expected} documents, got {actual}")]
    CorpusExhaustedEarly { expected: u32, actual: u32 },

    /// The naive builder's working set outgrew its memory budget. This is
    /// the instructive failure the naive/SPIMI comparison exists to show.
    #[error("memory budget exceeded: budget {budget} bytes, required {required} bytes")]
    OutOfMemory { budget: u64, required: u64 },

    /// A block could not be spilled to storage. Fatal for the build; blocks
    /// are written exactly once and never retried.
    #[error("failed to write block {}", path.display())]
    BlockWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A flushed block could not be read back during the merge.
    #[error("failed to read block {}", path.display())]
    BlockRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Document IDs must arrive strictly ascending; the merge's
    /// concatenation step depends on blocks covering disjoint ID ranges.
    #[error("document {doc_id} arrived out of order")]
    CorpusOutOfOrder { doc_id: DocId },
}

/// Per-query errors. These never touch index state; a failed query leaves
/// the index and every other query unaffected. A term missing from the
/// vocabulary is not an error, it simply matches zero documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query has no terms")]
    EmptyQuery,

    #[error("invalid operator {0:?}, expected AND or OR")]
    InvalidOperator(String),
}
