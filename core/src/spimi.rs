//! Single-Pass In-Memory Indexing with external merge.
//!
//! Documents stream into a memory-bounded block; when the block's estimated
//! footprint reaches the budget it is sorted by term and spilled to disk,
//! and a fresh block starts. Flushed blocks cover disjoint, ascending
//! document ranges, so the final k-way merge concatenates postings per term
//! without any deduplication. The merge holds one read-ahead record per
//! block and a single term's combined postings at a time; that bound is the
//! entire point of this builder versus the naive one.

use crate::error::BuildError;
use crate::index::{DocId, InvertedIndex, Posting};
use crate::persist::{self, BlockReader, BlockWriter};
use crate::{BuildStats, TokenizedDoc};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SpimiConfig {
    /// Estimated in-memory bytes a block may grow to before it is spilled.
    /// Checked at document granularity so each block covers a contiguous
    /// document range.
    pub block_budget: u64,
    /// Directory the block files are spilled into. Created if missing;
    /// block files are deleted again once the merge has consumed them.
    pub block_dir: PathBuf,
    /// When set, a stream yielding fewer documents fails the build.
    pub expected_docs: Option<u32>,
}

const POSTING_BYTES: u64 = mem::size_of::<Posting>() as u64;

/// One in-memory block: a partial index over a contiguous run of documents.
/// Postings are appended in document order, so they are already sorted by
/// doc ID when the block is flushed; only the terms need sorting then.
struct Block {
    map: HashMap<String, Vec<Posting>>,
    bytes: u64,
}

impl Block {
    fn new() -> Self {
        Self { map: HashMap::new(), bytes: 0 }
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn add(&mut self, doc_id: DocId, term: String) {
        use std::collections::hash_map::Entry;
        match self.map.entry(term) {
            Entry::Occupied(entry) => {
                let postings = entry.into_mut();
                match postings.last_mut() {
                    // Same document seen again for this term: bump the tail.
                    Some(last) if last.doc_id == doc_id => last.tf += 1,
                    _ => {
                        postings.push(Posting { doc_id, tf: 1 });
                        self.bytes += POSTING_BYTES;
                    }
                }
            }
            Entry::Vacant(entry) => {
                self.bytes += entry.key().len() as u64
                    + mem::size_of::<(String, Vec<Posting>)>() as u64
                    + POSTING_BYTES;
                entry.insert(vec![Posting { doc_id, tf: 1 }]);
            }
        }
    }

    /// Sort terms and write the block as a self-contained sorted run.
    fn flush(self, path: &Path) -> io::Result<()> {
        let mut entries: Vec<(String, Vec<Posting>)> = self.map.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut writer = BlockWriter::create(path, entries.len() as u64)?;
        for (term, postings) in &entries {
            debug_assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
            writer.write_entry(term, postings)?;
        }
        writer.finish()
    }
}

pub fn build_spimi<I>(docs: I, cfg: &SpimiConfig) -> Result<(InvertedIndex, BuildStats), BuildError>
where
    I: IntoIterator<Item = TokenizedDoc>,
{
    fs::create_dir_all(&cfg.block_dir)
        .map_err(|source| BuildError::BlockWrite { path: cfg.block_dir.clone(), source })?;

    let mut index = InvertedIndex::new();
    let mut block = Block::new();
    let mut block_paths: Vec<PathBuf> = Vec::new();
    let mut peak: u64 = 0;
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
            block.add(doc.doc_id, term);
        }
        peak = peak.max(block.bytes);
        if block.bytes >= cfg.block_budget {
            flush_block(&mut block, &cfg.block_dir, &mut block_paths)?;
        }
    }

    if let Some(expected) = cfg.expected_docs {
        if doc_count < expected {
            return Err(BuildError::CorpusExhaustedEarly { expected, actual: doc_count });
        }
    }

    if !block.is_empty() {
        flush_block(&mut block, &cfg.block_dir, &mut block_paths)?;
    }

    merge_blocks(&mut index, &block_paths)?;

    for path in &block_paths {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %err, "failed to remove consumed block");
        }
    }

    let stats = BuildStats {
        doc_count,
        term_count: index.num_terms(),
        postings_count: index.num_postings(),
        peak_memory_bytes: peak,
        block_count: block_paths.len() as u32,
    };
    tracing::info!(
        doc_count,
        blocks = stats.block_count,
        terms = stats.term_count,
        postings = stats.postings_count,
        "spimi index built"
    );
    Ok((index, stats))
}

fn flush_block(
    block: &mut Block,
    dir: &Path,
    block_paths: &mut Vec<PathBuf>,
) -> Result<(), BuildError> {
    let path = persist::block_path(dir, block_paths.len() as u32);
    let done = mem::replace(block, Block::new());
    tracing::debug!(
        block = block_paths.len(),
        terms = done.map.len(),
        bytes = done.bytes,
        "flushing block"
    );
    done.flush(&path)
        .map_err(|source| BuildError::BlockWrite { path: path.clone(), source })?;
    block_paths.push(path);
    Ok(())
}

/// The read-ahead record of one block stream, ordered by (term, block) so
/// equal terms pop in block order and their postings concatenate in
/// ascending document order.
struct HeadEntry {
    term: String,
    block: usize,
    postings: Vec<Posting>,
}

impl PartialEq for HeadEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.block == other.block
    }
}

impl Eq for HeadEntry {}

impl Ord for HeadEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term.cmp(&other.term).then(self.block.cmp(&other.block))
    }
}

impl PartialOrd for HeadEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deterministic sequential k-way merge over the flushed blocks: pop the
/// lexicographically smallest head term, gather every block holding that
/// term, emit one merged entry.
fn merge_blocks(index: &mut InvertedIndex, block_paths: &[PathBuf]) -> Result<(), BuildError> {
    let mut readers = Vec::with_capacity(block_paths.len());
    for path in block_paths {
        readers.push(
            BlockReader::open(path)
                .map_err(|source| BuildError::BlockRead { path: path.clone(), source })?,
        );
    }

    let mut heap: BinaryHeap<Reverse<HeadEntry>> = BinaryHeap::new();
    for (block, reader) in readers.iter_mut().enumerate() {
        advance(reader, &block_paths[block], block, &mut heap)?;
    }

    while let Some(Reverse(head)) = heap.pop() {
        let HeadEntry { term, block, mut postings } = head;
        advance(&mut readers[block], &block_paths[block], block, &mut heap)?;

        while heap.peek().is_some_and(|Reverse(next)| next.term == term) {
            let Some(Reverse(next)) = heap.pop() else { break };
            postings.extend(next.postings);
            advance(&mut readers[next.block], &block_paths[next.block], next.block, &mut heap)?;
        }

        index.insert_merged(term, postings);
    }

    tracing::debug!(blocks = block_paths.len(), terms = index.num_terms(), "merge complete");
    Ok(())
}

fn advance(
    reader: &mut BlockReader,
    path: &Path,
    block: usize,
    heap: &mut BinaryHeap<Reverse<HeadEntry>>,
) -> Result<(), BuildError> {
    let entry = reader
        .next_entry()
        .map_err(|source| BuildError::BlockRead { path: path.to_path_buf(), source })?;
    if let Some((term, postings)) = entry {
        heap.push(Reverse(HeadEntry { term, block, postings }));
    }
    Ok(())
}
