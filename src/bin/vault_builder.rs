use clap::error::ErrorKind;
use clap::Parser;
use hashvault::io_utils::{simple_cli_error, vault_cli_error};
use hashvault::{
    build_table, verify_order, BuildConfig, TableFile, VaultError, HASH_SIZE, NONCE_SIZE,
    RECORD_SIZE,
};
use std::path::{Path, PathBuf};

/// Build a sorted on-disk table of truncated BLAKE3 (hash, nonce) records.
#[derive(Parser)]
struct Args {
    /// Parallelization strategy (task|for); both run the same slice loop
    #[arg(short = 'a', long, default_value = "for")]
    approach: String,
    /// Generator threads, 0 means one per logical CPU
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,
    /// Reserved for a dedicated I/O thread pool
    #[arg(short = 'i', long, default_value_t = 1)]
    iothreads: usize,
    /// Reserved hash compression knob, must stay within 0..=HASH_SIZE
    #[arg(short = 'c', long, default_value_t = 0)]
    compression: usize,
    /// Total records = 2^exponent
    #[arg(short = 'k', long = "exponent", default_value_t = 26)]
    exponent: u32,
    /// Memory budget in MB for in-memory run buffers
    #[arg(short = 'm', long = "memory", default_value_t = 256)]
    memory_mb: u64,
    /// Final output path
    #[arg(short = 'f', long = "file", default_value = "output.bin")]
    file: PathBuf,
    /// Prefix for intermediate run files, named <prefix>.run<idx>
    #[arg(short = 'g', long = "file_final", default_value = "temp")]
    file_final: String,
    /// Reserved batch-size tuning knob
    #[arg(short = 'b', long = "batch-size", default_value_t = 262_144)]
    batch_size: u64,
    /// Print the first N records of the final file
    #[arg(short = 'p', long = "print", default_value_t = 0)]
    print: u64,
    /// Reserved search count; searching lives in vault_search
    #[arg(short = 's', long = "search", default_value_t = 0)]
    search: u64,
    /// Reserved difficulty knob
    #[arg(short = 'q', long = "difficulty", default_value_t = 3)]
    difficulty: usize,
    /// Verify hash order of the final file after the build (true|false)
    #[arg(short = 'v', long, default_value_t = false, action = clap::ArgAction::Set)]
    verify: bool,
    /// Per-run progress lines on stderr (true|false)
    #[arg(short = 'd', long, default_value_t = false, action = clap::ArgAction::Set)]
    debug: bool,
}

fn main() {
    let args = parse_args();
    if let Err(e) = run(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.approach != "for" && args.approach != "task" {
        return Err(simple_cli_error("--approach must be `task` or `for`").into());
    }
    if args.compression > HASH_SIZE {
        return Err(vault_cli_error(
            "parsing options",
            VaultError::Config(format!("--compression must stay within 0..={HASH_SIZE}")),
        )
        .into());
    }
    if args.search > 0 || args.difficulty != 3 {
        eprintln!("note: -s/--search and -q/--difficulty are reserved here; use vault_search");
    }

    let cfg = BuildConfig {
        exponent: args.exponent.max(1),
        memory_bytes: args.memory_mb.max(1) * 1024 * 1024,
        threads: args.threads,
        final_file: args.file.clone(),
        run_prefix: args.file_final.clone(),
        debug: args.debug,
        ..BuildConfig::default()
    };
    print_banner(&args, &cfg);

    let report = build_table(&cfg).map_err(|e| vault_cli_error("building table", e))?;

    if args.verify {
        let verdict =
            verify_order(&cfg.final_file).map_err(|e| vault_cli_error("verifying table", e))?;
        println!(
            "verify: {} read_MBps={:.2}",
            if verdict.ok { "OK" } else { "FAIL" },
            verdict.mb_per_sec
        );
    }
    if args.print > 0 {
        print_head(&cfg.final_file, args.print)?;
    }

    println!(
        "vault t{} i{} m{} k{} {:.2} {:.2} {:.6}",
        cfg.thread_count(),
        args.iothreads,
        args.memory_mb.max(1),
        cfg.exponent,
        report.mhash_per_sec(),
        report.mb_per_sec(),
        report.seconds
    );
    Ok(())
}

fn print_banner(args: &Args, cfg: &BuildConfig) {
    let bytes = cfg.total_records() * RECORD_SIZE as u64;
    println!("Selected Approach : {}", args.approach);
    println!("Number of Threads : {}", cfg.thread_count());
    println!("Exponent K : {}", cfg.exponent);
    println!("File Size (GB) : {:.2}", bytes as f64 / (1024.0 * 1024.0 * 1024.0));
    println!("File Size (bytes) : {bytes}");
    println!("Memory Size (MB) : {}", args.memory_mb.max(1));
    println!("Memory Size (bytes) : {}", cfg.memory_bytes);
    println!("Size of HASH : {HASH_SIZE}");
    println!("Size of NONCE : {NONCE_SIZE}");
    println!("Size of Record : {RECORD_SIZE}");
    println!("BATCH_SIZE : {}", args.batch_size);
    println!("Temporary File Prefix : {}", args.file_final);
    println!("Final Output File : {}", args.file.display());
}

/// First records of the table as `[byte_offset] hex_hash nonce=decimal`.
fn print_head(path: &Path, count: u64) -> Result<(), Box<dyn std::error::Error>> {
    let table = TableFile::open(path).map_err(|e| vault_cli_error("opening table", e))?;
    for index in 0..count.min(table.record_count()) {
        let rec = match table.record_at(index) {
            Some(rec) => rec,
            None => break,
        };
        println!(
            "[{}] {} nonce={}",
            index * RECORD_SIZE as u64,
            hex::encode(rec.hash),
            rec.nonce_value()
        );
    }
    Ok(())
}
