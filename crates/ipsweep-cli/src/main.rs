//! IpSweep CLI
//!
//! Recover an IPv4 address from its hex-encoded digest.

use std::io::Write;
use std::net::Ipv4Addr;
use std::ops::ControlFlow;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ipsweep_core::{
    encode_ipv4, format_duration, format_keys, hex, DigestAlgorithm, IpSearch, SearchConfig,
    SearchOutcome, SearchReport, SearchSpace, DEFAULT_BATCH_SIZE, DIGEST_LEN,
};

#[derive(Parser)]
#[command(name = "ipsweep")]
#[command(version = "0.1.0")]
#[command(about = "Brute-force the IPv4 address behind a digest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the address whose digest matches HASH
    Search {
        /// Target digest, hex encoded
        hash: String,

        /// Hash algorithm the target was produced with
        #[arg(short, long, default_value = "sha256")]
        algorithm: AlgorithmArg,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Maximum time in seconds (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_time: u64,

        /// Candidates per progress counter flush
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u64,

        /// First address to try
        #[arg(long, default_value = "0.0.0.0")]
        start: Ipv4Addr,

        /// Last address to try
        #[arg(long, default_value = "255.255.255.255")]
        end: Ipv4Addr,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the digest of an address
    Hash {
        /// Address to hash
        address: Ipv4Addr,

        /// Hash algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: AlgorithmArg,
    },

    /// Run benchmark
    Benchmark {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Hash algorithm
        #[arg(short, long, default_value = "sha256")]
        algorithm: AlgorithmArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Sha256,
    #[value(name = "sha3-256")]
    Sha3_256,
    Keccak256,
}

impl From<AlgorithmArg> for DigestAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => DigestAlgorithm::Sha256,
            AlgorithmArg::Sha3_256 => DigestAlgorithm::Sha3_256,
            AlgorithmArg::Keccak256 => DigestAlgorithm::Keccak256,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            hash,
            algorithm,
            threads,
            max_time,
            batch_size,
            start,
            end,
            json,
        } => {
            let config = SearchConfig {
                threads,
                batch_size,
                algorithm: algorithm.into(),
                space: SearchSpace::between(start, end)?,
                max_time_secs: max_time,
                ..Default::default()
            };
            cmd_search(&hash, config, json)?;
        }
        Commands::Hash { address, algorithm } => {
            cmd_hash(address, algorithm.into());
        }
        Commands::Benchmark {
            duration,
            threads,
            algorithm,
        } => {
            cmd_benchmark(duration, threads, algorithm.into())?;
        }
    }

    Ok(())
}

/// Decode a hex digest, tolerating surrounding whitespace and a `0x` prefix
fn parse_target(hash: &str) -> Result<Vec<u8>> {
    let trimmed = hash.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(trimmed).with_context(|| format!("Invalid hex digest: {}", hash))?;
    if bytes.len() != DIGEST_LEN {
        bail!(
            "Digest must be {} bytes ({} hex characters), got {} bytes",
            DIGEST_LEN,
            DIGEST_LEN * 2,
            bytes.len()
        );
    }
    Ok(bytes)
}

fn cmd_search(hash: &str, config: SearchConfig, json_output: bool) -> Result<()> {
    let target = parse_target(hash)?;

    if !json_output {
        eprintln!("IpSweep v0.1.0");
        eprintln!("Target: {}", hex::encode(&target));
        eprintln!("Algorithm: {}", config.algorithm);
        eprintln!(
            "Range: {} - {} ({} addresses)",
            Ipv4Addr::from(config.space.min),
            Ipv4Addr::from(config.space.max),
            format_keys(config.space.len())
        );
        eprintln!("Threads: {}", config.worker_count());
        eprintln!();
    }

    let search = IpSearch::new(&target, config)?;
    let report = search.run_with_progress(|snapshot| {
        if !json_output {
            eprint!("\r{}", snapshot.format());
            let _ = std::io::stderr().flush();
        }
        ControlFlow::Continue(())
    })?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!();
        print_report(&report);
    }

    Ok(())
}

fn cmd_hash(address: Ipv4Addr, algorithm: DigestAlgorithm) {
    let candidate = encode_ipv4(address.into());
    println!("{}", hex::encode(algorithm.digest(candidate.as_bytes())));
}

fn cmd_benchmark(duration_secs: u64, threads: usize, algorithm: DigestAlgorithm) -> Result<()> {
    let config = SearchConfig {
        threads,
        algorithm,
        max_time_secs: duration_secs.max(1),
        ..Default::default()
    };

    eprintln!("Benchmarking {} for {} seconds...", algorithm, config.max_time_secs);
    eprintln!("Threads: {}", config.worker_count());
    eprintln!();

    // No address digests to all zeros, so this runs until the deadline
    let search = IpSearch::new(&[0u8; DIGEST_LEN], config)?;
    let report = search.run()?;

    let full_sweep = if report.keys_per_second > 0.0 {
        report.total_keys as f64 / report.keys_per_second
    } else {
        0.0
    };

    println!("Keys Tested: {}", format_keys(report.keys_tested));
    println!("Speed:       {:.2} MIP/s", report.keys_per_second / 1_000_000.0);
    println!("Full sweep:  ~{}", format_duration(full_sweep));
    eprintln!("\nBenchmark complete!");

    Ok(())
}

fn print_report(report: &SearchReport) {
    println!();
    match &report.outcome {
        SearchOutcome::Found(found) => {
            println!("MATCH FOUND!");
            println!("{:-<60}", "");
            println!("Address:     {}", found.address());
        }
        SearchOutcome::Exhausted => {
            println!("No match: every address in range was tried.");
            println!("{:-<60}", "");
        }
        SearchOutcome::TimedOut => {
            println!("No match within the time limit.");
            println!("{:-<60}", "");
        }
        SearchOutcome::Aborted => {
            println!("Search aborted.");
            println!("{:-<60}", "");
        }
    }
    println!("Keys Tested: {} / {}", report.keys_tested, report.total_keys);
    println!("Time:        {:.2}s", report.time_secs);
    println!("Speed:       {:.2} MIP/s", report.keys_per_second / 1_000_000.0);
}
