use hashvault::{build_table, run_path, verify_order, BuildConfig, Record, VaultError, RECORD_SIZE};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn config(dir: &Path, exponent: u32, memory_bytes: u64, threads: usize) -> BuildConfig {
    BuildConfig {
        exponent,
        memory_bytes,
        threads,
        final_file: dir.join("output.bin"),
        run_prefix: dir.join("temp").to_string_lossy().into_owned(),
        merge_buffer: 512,
        debug: false,
    }
}

fn read_records(path: &Path) -> Vec<Record> {
    let bytes = fs::read(path).unwrap();
    bytemuck::cast_slice(&bytes).to_vec()
}

#[test]
fn single_run_build_covers_every_nonce() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path(), 8, 1024 * 1024, 1);
    let report = build_table(&cfg).unwrap();
    assert_eq!(report.records, 256);
    assert_eq!(report.runs, 1);

    let bytes = fs::read(&cfg.final_file).unwrap();
    assert_eq!(bytes.len(), 256 * RECORD_SIZE);

    let verdict = verify_order(&cfg.final_file).unwrap();
    assert!(verdict.ok);
    assert_eq!(verdict.records, 256);

    let mut nonces: Vec<u64> = read_records(&cfg.final_file)
        .iter()
        .map(|r| r.nonce_value())
        .collect();
    nonces.sort_unstable();
    let expected: Vec<u64> = (0..256).collect();
    assert_eq!(nonces, expected);
}

#[test]
fn bounded_memory_splits_into_runs_and_cleans_up() {
    let dir = tempdir().unwrap();
    // 256 records per run, 2^12 records total -> 16 runs
    let cfg = config(dir.path(), 12, 256 * RECORD_SIZE as u64, 4);
    let report = build_table(&cfg).unwrap();
    assert_eq!(report.runs, 16);

    let bytes = fs::read(&cfg.final_file).unwrap();
    assert_eq!(bytes.len(), 4096 * RECORD_SIZE);
    assert!(verify_order(&cfg.final_file).unwrap().ok);

    for idx in 0..report.runs {
        assert!(!run_path(&cfg.run_prefix, idx).exists());
    }

    let mut nonces: Vec<u64> = read_records(&cfg.final_file)
        .iter()
        .map(|r| r.nonce_value())
        .collect();
    nonces.sort_unstable();
    let expected: Vec<u64> = (0..4096).collect();
    assert_eq!(nonces, expected);
}

#[test]
fn rebuilds_agree_on_the_record_multiset() {
    let dir = tempdir().unwrap();
    // same exponent, different budgets and thread counts
    let first = config(dir.path(), 10, 128 * RECORD_SIZE as u64, 1);
    let second = BuildConfig {
        final_file: dir.path().join("other.bin"),
        memory_bytes: 1024 * 1024,
        threads: 4,
        ..first.clone()
    };
    build_table(&first).unwrap();
    build_table(&second).unwrap();

    let sort_key = |r: &Record| (r.hash, r.nonce);
    let mut a = read_records(&first.final_file);
    let mut b = read_records(&second.final_file);
    a.sort_unstable_by_key(sort_key);
    b.sort_unstable_by_key(sort_key);
    assert_eq!(a, b);
}

#[test]
fn oversized_exponent_is_a_config_error() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path(), 8, 1024 * 1024, 1);
    // 2^52 nonces cannot fit a six-byte nonce field
    cfg.exponent = 52;
    let err = build_table(&cfg).unwrap_err();
    assert!(matches!(err, VaultError::Config(_)));
    assert!(err.to_string().contains("config error"));
}

#[test]
fn every_hash_is_the_digest_of_its_nonce() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path(), 8, 1024 * 1024, 2);
    build_table(&cfg).unwrap();

    for rec in read_records(&cfg.final_file) {
        assert_eq!(rec, Record::from_nonce(rec.nonce_value()));
    }
}
