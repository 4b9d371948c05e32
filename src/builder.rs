use std::fs;
use std::time::Instant;

use crate::config::BuildConfig;
use crate::error::VaultError;
use crate::merge::merge_runs;
use crate::record::RECORD_SIZE;
use crate::runs::write_runs;

/// Figures reported after a completed build.
#[derive(Debug, Clone, Copy)]
pub struct BuildReport {
    pub records: u64,
    pub bytes: u64,
    pub runs: usize,
    pub seconds: f64,
}

impl BuildReport {
    pub fn mhash_per_sec(&self) -> f64 {
        self.records as f64 / 1e6 / self.seconds
    }

    pub fn mb_per_sec(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0) / self.seconds
    }
}

/// Produce sorted runs under the memory budget, merge them into the
/// final file and delete the runs. Run files are only removed after the
/// merge succeeds; on failure they are left behind along with whatever
/// partial final file exists.
pub fn build_table(cfg: &BuildConfig) -> Result<BuildReport, VaultError> {
    let start = Instant::now();
    let runs = write_runs(cfg)?;
    merge_runs(&runs, &cfg.final_file, cfg.merge_buffer)?;

    let records = cfg.total_records();
    let expected = records * RECORD_SIZE as u64;
    let actual = fs::metadata(&cfg.final_file)
        .map_err(|e| VaultError::io("inspecting final file", &cfg.final_file, e))?
        .len();
    if actual != expected {
        return Err(VaultError::Internal(format!(
            "final file is {actual} bytes, expected {expected}"
        )));
    }

    for path in &runs {
        fs::remove_file(path).map_err(|e| VaultError::io("removing run", path, e))?;
    }
    let seconds = start.elapsed().as_secs_f64().max(1e-9);
    Ok(BuildReport {
        records,
        bytes: expected,
        runs: runs.len(),
        seconds,
    })
}
