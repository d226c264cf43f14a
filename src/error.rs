use thiserror::Error;

#[derive(Error, Debug)]
pub enum SemiSortError {
    /// A bucket rejected a record after the probe-attempt bound. The sizing
    /// constants make this an n^-c event; hitting it means the sample badly
    /// underestimated a bucket's load.
    #[error("bucket {bucket_id} overflowed (offset {offset}, size {size}): no empty slot after {attempts} probes")]
    BucketOverflow {
        bucket_id: u64,
        offset: u32,
        size: u32,
        attempts: usize,
    },

    /// The planned working array outgrew the 32-bit slot addressing used by
    /// the bucket descriptors. Only reachable for inputs in the billions of
    /// records.
    #[error("bucket layout overflow: {slots} slots exceed 32-bit slot addressing")]
    LayoutOverflow { slots: u64 },

    #[error("semisort check failed at index {index}: {detail}")]
    CheckFailed { index: usize, detail: String },

    #[error("malformed sequence file at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("sequence type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("sequence length mismatch: input has {input} elements, output has {output}")]
    LengthMismatch { input: usize, output: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
