use clap::error::ErrorKind;
use clap::Parser;
use hashvault::io_utils::vault_cli_error;
use hashvault::{SearchStats, TableFile, HASH_SIZE, NONCE_SIZE, RECORD_SIZE};
use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;

/// Run random prefix-range queries against a sorted record table.
#[derive(Parser)]
struct Args {
    /// Exponent the table was built with; informational only, the file
    /// size dictates the record count
    #[arg(short = 'k', long = "k", default_value_t = 26)]
    k: u32,
    /// Sorted table produced by vault_builder
    #[arg(short = 'f', long = "file")]
    file: PathBuf,
    /// Number of random queries to run
    #[arg(short = 's', long = "searches", default_value_t = 1000)]
    searches: u64,
    /// Prefix length in bytes, clamped to the hash width
    #[arg(short = 'q', long = "difficulty", default_value_t = 3)]
    difficulty: usize,
    /// Per-query result lines (true|false)
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
    let difficulty = args.difficulty.clamp(1, HASH_SIZE);
    let table = TableFile::open(&args.file).map_err(|e| vault_cli_error("opening table", e))?;

    if args.debug {
        println!("searches={} difficulty={}", args.searches, difficulty);
        println!("Hash Size : {HASH_SIZE}  Nonce Size : {NONCE_SIZE}  Record Size : {RECORD_SIZE}");
        println!(
            "Exponent K : {}  Number of Records : {}  File Size : {} bytes",
            args.k,
            table.record_count(),
            table.record_count() * RECORD_SIZE as u64
        );
    }

    let mut rng = rand::thread_rng();
    let mut stats = SearchStats::default();
    let mut prefix = vec![0u8; difficulty];
    let start = Instant::now();

    for query in 0..args.searches {
        rng.fill(prefix.as_mut_slice());
        let outcome = table.prefix_query(&prefix);
        stats.record(&outcome);

        if args.debug {
            let shown = hex::encode(&prefix[..difficulty.min(3)]);
            if outcome.matches > 0 {
                println!(
                    "[{query}] {shown} MATCHES={} comps={} seeks={}",
                    outcome.matches, outcome.counters.comps, outcome.counters.seeks
                );
            } else {
                println!(
                    "[{query}] {shown} NOTFOUND comps={} seeks={}",
                    outcome.counters.comps, outcome.counters.seeks
                );
            }
        }
    }

    let seconds = start.elapsed().as_secs_f64();
    let per_query = |total: f64| {
        if args.searches > 0 {
            total / args.searches as f64
        } else {
            0.0
        }
    };
    let qps = if seconds > 0.0 {
        args.searches as f64 / seconds
    } else {
        0.0
    };

    println!(
        "Search Summary: requested={} performed={} found_queries={} total_matches={} notfound={}",
        args.searches, stats.queries, stats.found, stats.matches, stats.notfound
    );
    println!(
        "total_time={seconds:.6} s avg_ms={:.3} ms searches/sec={qps:.2} total_seeks={}",
        per_query(seconds * 1000.0),
        stats.counters.seeks
    );
    println!(
        "avg_seeks_per_search={:.3} total_comps={} avg_comps_per_search={:.3}",
        per_query(stats.counters.seeks as f64),
        stats.counters.comps,
        per_query(stats.counters.comps as f64)
    );
    println!(
        "avg_bytes_read_per_search={:.1}",
        per_query(stats.counters.bytes_read() as f64)
    );
    Ok(())
}
