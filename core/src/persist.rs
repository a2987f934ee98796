//! Block spill storage for the SPIMI builder.
//!
//! A flushed block is the only persisted intermediate state in the system:
//! a bincode `u64` record count followed by that many `(term, postings)`
//! records in ascending term order. The layout supports exactly what the
//! merge needs, a single sequential read per block in term order.

use crate::Posting;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// File name for block `block_id` inside the spill directory.
pub fn block_path(dir: &Path, block_id: u32) -> PathBuf {
    dir.join(format!("{block_id:06}.block.bin"))
}

fn to_io(err: bincode::Error) -> io::Error {
    match *err {
        bincode::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Sequential writer for one block. Entries must be written in ascending
/// term order; the writer is created with the final entry count and the
/// block is immutable once [`finish`](BlockWriter::finish) returns.
pub struct BlockWriter {
    writer: BufWriter<File>,
}

impl BlockWriter {
    pub fn create(path: &Path, entry_count: u64) -> io::Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, &entry_count).map_err(to_io)?;
        Ok(Self { writer })
    }

    pub fn write_entry(&mut self, term: &str, postings: &[Posting]) -> io::Result<()> {
        bincode::serialize_into(&mut self.writer, &(term, postings)).map_err(to_io)
    }

    pub fn finish(self) -> io::Result<()> {
        self.writer.into_inner()?.sync_all()
    }
}

/// Sequential reader over one flushed block, yielding entries in the term
/// order they were written. Holds a single buffered record's worth of state;
/// the merge keeps one of these per block and nothing more.
pub struct BlockReader {
    reader: BufReader<File>,
    remaining: u64,
}

impl BlockReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let remaining: u64 = bincode::deserialize_from(&mut reader).map_err(to_io)?;
        Ok(Self { reader, remaining })
    }

    /// Next `(term, postings)` record, `None` once the block is exhausted.
    pub fn next_entry(&mut self) -> io::Result<Option<(String, Vec<Posting>)>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let entry = bincode::deserialize_from(&mut self.reader).map_err(to_io)?;
        Ok(Some(entry))
    }
}
