//! Verify a semisort output against its input: every key's occurrences must
//! form one contiguous run whose length equals the key's input frequency.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use semisort::seq_io::read_int_sequence;
use semisort::util::verify_frequency_runs;

#[derive(Parser)]
#[command(about = "Check a semisorted sequence file against its input")]
struct Args {
    infile: PathBuf,
    outfile: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let input = read_int_sequence(&args.infile)?;
    let output = read_int_sequence(&args.outfile)?;
    if input.len() != output.len() {
        bail!(
            "in and out lengths don't match: {} vs {}",
            input.len(),
            output.len()
        );
    }
    verify_frequency_runs(&input, &output)?;
    println!("OK: {} elements semisorted", output.len());
    Ok(())
}
