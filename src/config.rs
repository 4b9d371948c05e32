use std::path::PathBuf;
use std::thread;

use crate::error::VaultError;
use crate::record::{NONCE_SIZE, RECORD_SIZE};

/// Runtime configuration for one table build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Total records to generate, as a power of two: `2^exponent`.
    pub exponent: u32,
    /// Memory budget in bytes for the in-memory run buffer.
    ///
    /// The CLI takes megabytes; tests hand the library smaller budgets
    /// to force multi-run builds at low exponents.
    pub memory_bytes: u64,
    /// Generator threads. Zero means one per logical CPU.
    pub threads: usize,
    /// Final output path.
    pub final_file: PathBuf,
    /// Prefix for intermediate run files, named `<prefix>.run<idx>`.
    pub run_prefix: String,
    /// Records held per merge reader window and per output flush.
    pub merge_buffer: usize,
    /// Per-run progress lines on stderr.
    pub debug: bool,
}

impl BuildConfig {
    pub fn total_records(&self) -> u64 {
        1u64 << self.exponent
    }

    /// Records per run under the memory budget, at least one.
    pub fn records_per_run(&self) -> u64 {
        (self.memory_bytes / RECORD_SIZE as u64).max(1)
    }

    pub fn thread_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            logical_cpus()
        }
    }

    /// Check the bounds the generator depends on. The exponent must
    /// leave every nonce in `[0, 2^K)` representable in the nonce field.
    pub fn validate(&self) -> Result<(), VaultError> {
        let max_exponent = (8 * NONCE_SIZE) as u32;
        if self.exponent == 0 || self.exponent > max_exponent {
            return Err(VaultError::Config(format!(
                "exponent {} outside 1..={max_exponent}",
                self.exponent
            )));
        }
        if self.memory_bytes == 0 {
            return Err(VaultError::Config(
                "memory budget must be at least one byte".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            exponent: 26,
            memory_bytes: 256 * 1024 * 1024,
            threads: 0,
            final_file: PathBuf::from("output.bin"),
            run_prefix: "temp".to_string(),
            merge_buffer: 65_536,
            debug: false,
        }
    }
}

pub fn logical_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
