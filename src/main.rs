use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bumpalo::Bump;
use clap::{Parser, Subcommand};

use bwasw_core::{align, AlignOutcome, NaiveReferenceIndex, SwOptions};

#[derive(Parser, Debug)]
#[command(name = "bwasw-core", about = "BWA-SW-style local alignment against an FM-indexed reference")]
struct Cli {
    /// Increase log verbosity (stacks: -v, -vv). Overridden by `RUST_LOG` if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align every query line against a reference, printing one result per line.
    Align {
        /// Reference genome (FASTA; header lines starting with `>` are stripped).
        reference: PathBuf,
        /// Query file (one sequence per line).
        queries: PathBuf,
        /// Beam width (cells kept per DAWG-node row).
        #[arg(long, default_value_t = SwOptions::default().n_best)]
        n_best: usize,
        /// Minimum score for a result to be reported as an alignment.
        #[arg(long, default_value_t = SwOptions::default().min_sc)]
        min_sc: i32,
        /// Match reward.
        #[arg(long, default_value_t = SwOptions::default().match_score)]
        match_score: i32,
        /// Mismatch penalty (magnitude).
        #[arg(long, default_value_t = SwOptions::default().mismatch)]
        mismatch: i32,
        /// Gap-open penalty (magnitude).
        #[arg(long, default_value_t = SwOptions::default().gap_open)]
        gap_open: i32,
        /// Gap-extend penalty (magnitude).
        #[arg(long, default_value_t = SwOptions::default().gap_ext)]
        gap_ext: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Align {
            reference,
            queries,
            n_best,
            min_sc,
            match_score,
            mismatch,
            gap_open,
            gap_ext,
        } => {
            let opts = SwOptions::default()
                .with_n_best(n_best)
                .with_min_sc(min_sc)
                .with_match_mismatch(match_score, mismatch)
                .with_gap_penalties(gap_open, gap_ext);
            run_align(reference, queries, opts)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins if set; otherwise `-v`/`-vv` maps onto the
/// `bwasw_core::dawg`/`bwasw_core::sw` debug surface.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_filter = match verbose {
        0 => "warn",
        1 => "bwasw_core=debug",
        _ => "bwasw_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_align(reference_path: PathBuf, queries_path: PathBuf, opts: SwOptions) -> Result<()> {
    let reference_seq = read_sequence_file(&reference_path)
        .with_context(|| format!("failed to read reference from {}", reference_path.display()))?;
    let reference =
        NaiveReferenceIndex::build(&reference_seq).context("failed to build reference FM-index")?;

    let reader = BufReader::new(
        File::open(&queries_path)
            .with_context(|| format!("failed to open query file {}", queries_path.display()))?,
    );

    let mut arena = Bump::new();
    for (idx, line) in reader.lines().enumerate() {
        let query = line?.trim().to_ascii_uppercase();
        if query.is_empty() {
            continue;
        }

        arena.reset();
        match align(&arena, &opts, &reference, query.as_bytes()) {
            Ok(AlignOutcome::Aligned(result)) => {
                println!(
                    "query {}\tscore={}\tmlen={}\tblen={}\tinterval=[{}, {})\tcigar={}",
                    idx + 1,
                    result.score,
                    result.mlen,
                    result.blen,
                    result.lo,
                    result.hi,
                    format_cigar(&result.cigar)
                );
            }
            Ok(AlignOutcome::NoAlignment) => {
                println!("query {}\tno alignment", idx + 1);
            }
            Err(err) => {
                println!("query {}\trejected: {err}", idx + 1);
            }
        }
    }

    Ok(())
}

fn format_cigar(cigar: &[u32]) -> String {
    cigar
        .iter()
        .map(|&entry| {
            let len = entry >> 4;
            let op = match entry & 0xf {
                1 => 'I',
                2 => 'D',
                7 => '=',
                8 => 'X',
                _ => '?',
            };
            format!("{len}{op}")
        })
        .collect()
}

fn read_sequence_file(path: &PathBuf) -> Result<Vec<u8>> {
    let contents = std::fs::read_to_string(path)?;
    let sequence: String = contents
        .lines()
        .filter(|line| !line.starts_with('>') && !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("");
    Ok(sequence.trim().to_ascii_uppercase().into_bytes())
}
