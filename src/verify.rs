use bytemuck::Zeroable;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use crate::error::VaultError;
use crate::record::{Record, RECORD_SIZE};

/// Records examined per read while streaming the table.
const CHUNK_RECORDS: usize = 1 << 18;

#[derive(Debug, Clone, Copy)]
pub struct VerifyReport {
    pub ok: bool,
    /// Records examined before success or the first inversion.
    pub records: u64,
    pub mb_per_sec: f64,
}

/// Stream the table once and check that adjacent hashes never decrease.
/// Stops at the first out-of-order pair. Count and content are not
/// checked here; the builder owns those.
pub fn verify_order(path: &Path) -> Result<VerifyReport, VaultError> {
    let mut file = File::open(path).map_err(|e| VaultError::io("opening table", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| VaultError::io("inspecting table", path, e))?
        .len();
    let mut buf = vec![Record::zeroed(); CHUNK_RECORDS];
    let mut prev: Option<Record> = None;
    let mut records = 0u64;
    let mut ok = true;
    let start = Instant::now();

    'stream: loop {
        let bytes = bytemuck::cast_slice_mut(buf.as_mut_slice());
        let mut filled = 0usize;
        while filled < bytes.len() {
            let n = file
                .read(&mut bytes[filled..])
                .map_err(|e| VaultError::io("reading table", path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let got = filled / RECORD_SIZE;
        if got == 0 {
            break;
        }
        for rec in &buf[..got] {
            if let Some(p) = prev {
                if p.hash > rec.hash {
                    ok = false;
                    break 'stream;
                }
            }
            prev = Some(*rec);
            records += 1;
        }
    }

    let seconds = start.elapsed().as_secs_f64().max(1e-9);
    Ok(VerifyReport {
        ok,
        records,
        mb_per_sec: size as f64 / (1024.0 * 1024.0) / seconds,
    })
}
