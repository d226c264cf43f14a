//! Time the semisort pipeline on a sequence file, optionally writing the
//! semisorted keys for the checker.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use semisort::hash::FastIntHash;
use semisort::seq_io::{read_int_sequence, write_int_sequence};
use semisort::util::records_from_keys;
use semisort::{semi_sort_with_hash, SemiSortParams};

#[derive(Parser)]
#[command(about = "Run semisort on a sequenceInt file")]
struct Args {
    infile: PathBuf,
    /// Write the semisorted key sequence here.
    #[arg(short, long)]
    outfile: Option<PathBuf>,
    #[arg(short, long, default_value_t = 1)]
    rounds: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let keys = read_int_sequence(&args.infile)?;
    let params = SemiSortParams::default();

    let mut records = Vec::new();
    for round in 0..args.rounds.max(1) {
        records = records_from_keys(&keys);
        let start = Instant::now();
        semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &params);
        println!(
            "round {round}: semisorted {} records in {:.3?}",
            records.len(),
            start.elapsed()
        );
    }

    if let Some(outfile) = &args.outfile {
        let out_keys: Vec<u64> = records.iter().map(|r| r.key).collect();
        write_int_sequence(outfile, &out_keys)?;
    }
    Ok(())
}
