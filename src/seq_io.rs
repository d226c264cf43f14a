//! Text sequence files shared by the generator and check programs: a type-tag
//! header line followed by one decimal value per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::SemiSortError;

pub const INT_SEQUENCE_HEADER: &str = "sequenceInt";

pub fn write_int_sequence(path: &Path, values: &[u64]) -> Result<(), SemiSortError> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "{INT_SEQUENCE_HEADER}")?;
    for v in values {
        writeln!(w, "{v}")?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_int_sequence(path: &Path) -> Result<Vec<u64>, SemiSortError> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(SemiSortError::Parse {
                line: 1,
                msg: "empty file".into(),
            })
        }
    };
    if header.trim() != INT_SEQUENCE_HEADER {
        return Err(SemiSortError::TypeMismatch {
            expected: INT_SEQUENCE_HEADER.into(),
            found: header,
        });
    }

    let mut values = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let v = trimmed.parse::<u64>().map_err(|e| SemiSortError::Parse {
            line: i + 2,
            msg: e.to_string(),
        })?;
        values.push(v);
    }
    Ok(values)
}
