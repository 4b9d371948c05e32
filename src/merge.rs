use bytemuck::Zeroable;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::VaultError;
use crate::record::{Record, RECORD_SIZE};

/// Buffered reader over one sorted run file.
///
/// Keeps a window of up to `cap` records in memory and refills it when
/// the window drains. A refill that yields no records marks end of file;
/// a trailing partial record is ignored.
pub struct RunReader {
    path: PathBuf,
    file: File,
    buf: Vec<Record>,
    pos: usize,
    cap: usize,
    eof: bool,
}

impl RunReader {
    pub fn open(path: &Path, cap: usize) -> Result<Self, VaultError> {
        let file = File::open(path).map_err(|e| VaultError::io("opening run", path, e))?;
        let mut reader = RunReader {
            path: path.to_path_buf(),
            file,
            buf: Vec::new(),
            pos: 0,
            cap: cap.max(1),
            eof: false,
        };
        reader.refill()?;
        Ok(reader)
    }

    fn refill(&mut self) -> Result<(), VaultError> {
        if self.eof {
            return Ok(());
        }
        self.buf.resize(self.cap, Record::zeroed());
        let bytes = bytemuck::cast_slice_mut(self.buf.as_mut_slice());
        let mut filled = 0usize;
        while filled < bytes.len() {
            let n = self
                .file
                .read(&mut bytes[filled..])
                .map_err(|e| VaultError::io("reading run", &self.path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let records = filled / RECORD_SIZE;
        self.buf.truncate(records);
        self.pos = 0;
        if records == 0 {
            self.eof = true;
        }
        Ok(())
    }

    /// Take the next record, refilling the window behind it.
    pub fn next(&mut self) -> Result<Option<Record>, VaultError> {
        if self.eof || self.pos >= self.buf.len() {
            return Ok(None);
        }
        let rec = self.buf[self.pos];
        self.pos += 1;
        if self.pos >= self.buf.len() {
            self.refill()?;
        }
        Ok(Some(rec))
    }
}

struct HeapEntry {
    rec: Record,
    run: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rec.hash == other.rec.hash && self.run == other.run
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Ordered by hash bytes; run index breaks ties among equal hashes.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rec
            .hash
            .cmp(&other.rec.hash)
            .then(self.run.cmp(&other.run))
    }
}

/// Merge sorted run files into `final_file` with a min-heap seeded from
/// the head of every non-empty run. `buffer_records` bounds each reader
/// window and the output buffer alike.
///
/// A failed open or write is fatal; a partial final file may remain.
pub fn merge_runs(
    runs: &[PathBuf],
    final_file: &Path,
    buffer_records: usize,
) -> Result<(), VaultError> {
    let buffer_records = buffer_records.max(1);
    let mut readers = Vec::with_capacity(runs.len());
    for path in runs {
        readers.push(RunReader::open(path, buffer_records)?);
    }

    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (run, reader) in readers.iter_mut().enumerate() {
        if let Some(rec) = reader.next()? {
            heap.push(Reverse(HeapEntry { rec, run }));
        }
    }

    let mut out = File::create(final_file)
        .map_err(|e| VaultError::io("creating final file", final_file, e))?;
    let mut pending: Vec<Record> = Vec::with_capacity(buffer_records);
    while let Some(Reverse(entry)) = heap.pop() {
        pending.push(entry.rec);
        if pending.len() >= buffer_records {
            out.write_all(bytemuck::cast_slice(&pending))
                .map_err(|e| VaultError::io("writing final file", final_file, e))?;
            pending.clear();
        }
        if let Some(rec) = readers[entry.run].next()? {
            heap.push(Reverse(HeapEntry { rec, run: entry.run }));
        }
    }
    if !pending.is_empty() {
        out.write_all(bytemuck::cast_slice(&pending))
            .map_err(|e| VaultError::io("writing final file", final_file, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(first: u8, nonce: u64) -> Record {
        let mut rec = Record::from_nonce(nonce);
        rec.hash = [0; crate::record::HASH_SIZE];
        rec.hash[0] = first;
        rec
    }

    fn write_run(path: &Path, records: &[Record]) {
        fs::write(path, bytemuck::cast_slice(records)).unwrap();
    }

    #[test]
    fn merge_interleaves_two_runs() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.run0");
        let b = dir.path().join("a.run1");
        write_run(&a, &[record(0, 0), record(2, 1), record(4, 2)]);
        write_run(&b, &[record(1, 3), record(3, 4), record(5, 5)]);

        let out = dir.path().join("merged.bin");
        // window of two records forces mid-merge refills and flushes
        merge_runs(&[a, b], &out, 2).unwrap();

        let bytes = fs::read(&out).unwrap();
        let merged: &[Record] = bytemuck::cast_slice(&bytes);
        assert_eq!(merged.len(), 6);
        let firsts: Vec<u8> = merged.iter().map(|r| r.hash[0]).collect();
        assert_eq!(firsts, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_runs_merge_to_an_empty_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.run0");
        write_run(&a, &[]);
        let out = dir.path().join("merged.bin");
        merge_runs(&[a], &out, 8).unwrap();
        assert_eq!(fs::read(&out).unwrap().len(), 0);
    }

    #[test]
    fn reader_streams_past_its_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.run0");
        let records: Vec<Record> = (0..10).map(|i| record(i as u8, i)).collect();
        write_run(&path, &records);

        let mut reader = RunReader::open(&path, 3).unwrap();
        let mut seen = Vec::new();
        while let Some(rec) = reader.next().unwrap() {
            seen.push(rec);
        }
        assert_eq!(seen, records);
    }
}
