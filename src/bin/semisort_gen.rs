//! Generate test sequences for the semisort driver and checker.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use semisort::seq_io::write_int_sequence;
use semisort::util::{generate_exponential, generate_uniform, generate_zipf};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dist {
    Uniform,
    Exponential,
    Zipf,
}

#[derive(Parser)]
#[command(about = "Write a sequenceInt file drawn from a test distribution")]
struct Args {
    /// Number of elements.
    size: usize,
    /// Output file.
    outfile: PathBuf,
    #[arg(long, value_enum, default_value_t = Dist::Uniform)]
    dist: Dist,
    /// Key range upper bound (uniform).
    #[arg(long, default_value_t = 100_000)]
    range: u64,
    /// Rate parameter (exponential).
    #[arg(long, default_value_t = 10.0)]
    lambda: f64,
    /// Skew exponent (zipf).
    #[arg(long, default_value_t = 1.0)]
    alpha: f64,
    /// Key universe size (zipf).
    #[arg(long, default_value_t = 10_000)]
    universe: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let keys = match args.dist {
        Dist::Uniform => generate_uniform(args.size, args.range, args.seed),
        Dist::Exponential => generate_exponential(args.size, args.lambda, args.seed),
        Dist::Zipf => generate_zipf(args.size, args.alpha, args.universe, args.seed),
    };
    write_int_sequence(&args.outfile, &keys)?;
    println!("wrote {} elements to {}", keys.len(), args.outfile.display());
    Ok(())
}
