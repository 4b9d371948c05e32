use std::fs::File;
use std::path::Path;

use crate::error::VaultError;
use crate::record::{Record, HASH_SIZE, RECORD_SIZE};

/// Probe accounting for one bisection or one whole query.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbeCounters {
    /// Probes issued, one per bisection iteration.
    pub seeks: u64,
    /// Key comparisons performed.
    pub comps: u64,
    /// Positional reads that returned a full record.
    pub reads_ok: u64,
}

impl ProbeCounters {
    pub fn add(&mut self, other: &ProbeCounters) {
        self.seeks += other.seeks;
        self.comps += other.comps;
        self.reads_ok += other.reads_ok;
    }

    pub fn bytes_read(&self) -> u64 {
        self.reads_ok * RECORD_SIZE as u64
    }
}

/// Bounds for every hash sharing a prefix: the prefix padded with 0x00
/// and 0xFF out to the hash width.
pub fn prefix_bounds(prefix: &[u8]) -> ([u8; HASH_SIZE], [u8; HASH_SIZE]) {
    debug_assert!(!prefix.is_empty() && prefix.len() <= HASH_SIZE);
    let mut low = [0x00u8; HASH_SIZE];
    let mut high = [0xFFu8; HASH_SIZE];
    low[..prefix.len()].copy_from_slice(prefix);
    high[..prefix.len()].copy_from_slice(prefix);
    (low, high)
}

/// Outcome of one prefix-range query.
#[derive(Debug, Clone, Copy)]
pub struct QueryOutcome {
    pub lower: u64,
    pub upper: u64,
    pub matches: u64,
    pub counters: ProbeCounters,
}

/// Aggregate totals across a batch of prefix queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub queries: u64,
    pub found: u64,
    pub notfound: u64,
    pub matches: u64,
    pub counters: ProbeCounters,
}

impl SearchStats {
    pub fn record(&mut self, outcome: &QueryOutcome) {
        self.queries += 1;
        if outcome.matches > 0 {
            self.found += 1;
        } else {
            self.notfound += 1;
        }
        self.matches += outcome.matches;
        self.counters.add(&outcome.counters);
    }
}

/// A sorted record table opened for positional probing. The table is an
/// immutable array of `filesize / RECORD_SIZE` records; every probe is
/// one positional read, independent of any cursor.
#[derive(Debug)]
pub struct TableFile {
    file: File,
    records: u64,
}

impl TableFile {
    /// Open a table, refusing any file whose size is not a whole number
    /// of records.
    pub fn open(path: &Path) -> Result<Self, VaultError> {
        let file = File::open(path).map_err(|e| VaultError::io("opening table", path, e))?;
        let size = file
            .metadata()
            .map_err(|e| VaultError::io("inspecting table", path, e))?
            .len();
        if size % RECORD_SIZE as u64 != 0 {
            return Err(VaultError::SizeMismatch(format!(
                "'{}' is {} bytes, not a multiple of the {}-byte record",
                path.display(),
                size,
                RECORD_SIZE
            )));
        }
        Ok(TableFile {
            file,
            records: size / RECORD_SIZE as u64,
        })
    }

    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Positional read of one whole record. `None` past the end or on a
    /// short read.
    pub fn record_at(&self, index: u64) -> Option<Record> {
        if index >= self.records {
            return None;
        }
        let mut buf = [0u8; RECORD_SIZE];
        if read_at(&self.file, &mut buf, index * RECORD_SIZE as u64).is_err() {
            return None;
        }
        Some(*bytemuck::from_bytes::<Record>(&buf))
    }

    fn hash_at(&self, index: u64) -> Option<[u8; HASH_SIZE]> {
        let mut buf = [0u8; RECORD_SIZE];
        if read_at(&self.file, &mut buf, index * RECORD_SIZE as u64).is_err() {
            return None;
        }
        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&buf[..HASH_SIZE]);
        Some(hash)
    }

    /// Smallest index whose hash is `>= key`, or the record count if
    /// none. Counters tick once per iteration before the probe; a short
    /// read ends the bisection at the current lower estimate and shows
    /// up only as a `reads_ok` gap.
    pub fn lower_bound(&self, key: &[u8; HASH_SIZE], counters: &mut ProbeCounters) -> u64 {
        let mut lo = 0u64;
        let mut hi = self.records;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            counters.seeks += 1;
            counters.comps += 1;
            let hash = match self.hash_at(mid) {
                Some(hash) => hash,
                None => break,
            };
            counters.reads_ok += 1;
            if hash < *key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Smallest index whose hash is `> key`, or the record count if
    /// none.
    pub fn upper_bound(&self, key: &[u8; HASH_SIZE], counters: &mut ProbeCounters) -> u64 {
        let mut lo = 0u64;
        let mut hi = self.records;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            counters.seeks += 1;
            counters.comps += 1;
            let hash = match self.hash_at(mid) {
                Some(hash) => hash,
                None => break,
            };
            counters.reads_ok += 1;
            if hash <= *key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Count the records whose leading bytes equal `prefix` with two
    /// bisections over the file.
    pub fn prefix_query(&self, prefix: &[u8]) -> QueryOutcome {
        let (low, high) = prefix_bounds(prefix);
        let mut counters = ProbeCounters::default();
        let lower = self.lower_bound(&low, &mut counters);
        let upper = self.upper_bound(&high, &mut counters);
        QueryOutcome {
            lower,
            upper,
            matches: upper.saturating_sub(lower),
            counters,
        }
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut done = 0usize;
    while done < buf.len() {
        let n = file.seek_read(&mut buf[done..], offset + done as u64)?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        done += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(first: u8) -> Record {
        let mut rec = Record::from_nonce(first as u64);
        rec.hash = [0; HASH_SIZE];
        rec.hash[0] = first;
        rec
    }

    fn key(first: u8) -> [u8; HASH_SIZE] {
        let mut key = [0u8; HASH_SIZE];
        key[0] = first;
        key
    }

    fn table_of(dir: &Path, firsts: &[u8]) -> TableFile {
        let path = dir.join("table.bin");
        let records: Vec<Record> = firsts.iter().map(|&f| record(f)).collect();
        fs::write(&path, bytemuck::cast_slice(&records)).unwrap();
        TableFile::open(&path).unwrap()
    }

    #[test]
    fn bounds_over_duplicates() {
        let dir = tempdir().unwrap();
        let table = table_of(dir.path(), &[1, 3, 3, 3, 7]);

        let mut counters = ProbeCounters::default();
        assert_eq!(table.lower_bound(&key(3), &mut counters), 1);
        assert_eq!(table.upper_bound(&key(3), &mut counters), 4);
        assert_eq!(table.lower_bound(&key(0), &mut counters), 0);
        assert_eq!(table.lower_bound(&key(9), &mut counters), 5);
        assert_eq!(table.upper_bound(&key(9), &mut counters), 5);
        // every probe compared and completed
        assert_eq!(counters.seeks, counters.comps);
        assert_eq!(counters.seeks, counters.reads_ok);
    }

    #[test]
    fn prefix_query_counts_the_interval() {
        let dir = tempdir().unwrap();
        let table = table_of(dir.path(), &[1, 3, 3, 3, 7]);

        let outcome = table.prefix_query(&[3]);
        assert_eq!((outcome.lower, outcome.upper), (1, 4));
        assert_eq!(outcome.matches, 3);

        let missing = table.prefix_query(&[5]);
        assert_eq!(missing.matches, 0);
        assert_eq!(missing.lower, missing.upper);
    }

    #[test]
    fn probe_count_is_logarithmic() {
        let dir = tempdir().unwrap();
        let firsts: Vec<u8> = (0..128).collect();
        let table = table_of(dir.path(), &firsts);

        let mut counters = ProbeCounters::default();
        table.lower_bound(&key(77), &mut counters);
        // ceil(log2(129)) iterations at most
        assert!(counters.seeks <= 8);
    }

    #[test]
    fn empty_table_has_empty_bounds() {
        let dir = tempdir().unwrap();
        let table = table_of(dir.path(), &[]);
        let outcome = table.prefix_query(&[0x42]);
        assert_eq!(outcome.matches, 0);
        assert_eq!(outcome.counters.seeks, 0);
    }

    #[test]
    fn odd_sized_file_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        fs::write(&path, [0u8; 17]).unwrap();
        let err = TableFile::open(&path).unwrap_err();
        assert!(matches!(err, VaultError::SizeMismatch(_)));
    }
}
