use bytemuck::Zeroable;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::thread;

use crate::config::BuildConfig;
use crate::error::VaultError;
use crate::record::Record;

/// Name of the idx-th intermediate run file for a prefix.
pub fn run_path(prefix: &str, idx: usize) -> PathBuf {
    PathBuf::from(format!("{prefix}.run{idx}"))
}

/// Generate every nonce in `[0, 2^K)` as a sequence of sorted run files,
/// each bounded by the memory budget. Returns the run paths in
/// production order; their record counts sum to `2^K`.
///
/// Any failure to create or write a run aborts the build.
pub fn write_runs(cfg: &BuildConfig) -> Result<Vec<PathBuf>, VaultError> {
    cfg.validate()?;
    let total = cfg.total_records();
    let per_run = cfg.records_per_run();
    let threads = cfg.thread_count();

    let mut runs = Vec::new();
    let mut produced = 0u64;
    while produced < total {
        let todo = per_run.min(total - produced) as usize;
        let mut buf = vec![Record::zeroed(); todo];
        fill_records(&mut buf, produced, threads);
        buf.sort_unstable_by(|a, b| a.hash.cmp(&b.hash));

        let path = run_path(&cfg.run_prefix, runs.len());
        let mut file =
            File::create(&path).map_err(|e| VaultError::io("creating run", &path, e))?;
        file.write_all(bytemuck::cast_slice(&buf))
            .map_err(|e| VaultError::io("writing run", &path, e))?;

        produced += todo as u64;
        if cfg.debug {
            eprintln!(
                "[run {}] wrote {} records ({:.1}%)",
                runs.len(),
                todo,
                100.0 * produced as f64 / total as f64
            );
        }
        runs.push(path);
    }
    Ok(runs)
}

/// Fill the buffer with the records for nonces `base..base + buf.len()`.
/// Each worker owns a disjoint contiguous chunk; the scope join is the
/// only synchronization point before the sort.
fn fill_records(buf: &mut [Record], base: u64, threads: usize) {
    let threads = threads.max(1);
    let chunk = (buf.len() + threads - 1) / threads;
    if chunk == 0 {
        return;
    }
    thread::scope(|s| {
        for (w, slab) in buf.chunks_mut(chunk).enumerate() {
            let start = base + (w * chunk) as u64;
            s.spawn(move || {
                for (i, rec) in slab.iter_mut().enumerate() {
                    *rec = Record::from_nonce(start + i as u64);
                }
            });
        }
    });
}
