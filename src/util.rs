//! Internal utilities and test-data generators, exposed for testing and
//! benchmarking purposes.

use std::time::Instant;

use colored::Colorize;
use fxhash::FxHashMap;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::error::SemiSortError;
use crate::Record;

pub(crate) fn log_duration(name: &str, start: Instant) -> Instant {
    trace!(
        "{}",
        format!("{name:>12}: {:>11.2?}", start.elapsed()).bold()
    );
    Instant::now()
}

const GEN_CHUNK: usize = 1 << 16;

/// Uniformly distributed keys in `[0, range]`.
pub fn generate_uniform(n: usize, range: u64, seed: u64) -> Vec<u64> {
    let mut keys = vec![0u64; n];
    keys.par_chunks_mut(GEN_CHUNK)
        .enumerate()
        .for_each(|(chunk, out)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed ^ chunk as u64);
            for key in out.iter_mut() {
                *key = rng.random_range(0..=range);
            }
        });
    keys
}

/// Exponentially distributed keys with rate `lambda`, scaled by `n`.
pub fn generate_exponential(n: usize, lambda: f64, seed: u64) -> Vec<u64> {
    let mut keys = vec![0u64; n];
    keys.par_chunks_mut(GEN_CHUNK)
        .enumerate()
        .for_each(|(chunk, out)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed ^ chunk as u64);
            for key in out.iter_mut() {
                let u: f64 = rng.random();
                *key = (n as f64 * -(1.0 - u).ln() / lambda) as u64;
            }
        });
    keys
}

/// Zipf(`alpha`) keys over `[0, universe)` via inverse-CDF sampling.
pub fn generate_zipf(n: usize, alpha: f64, universe: usize, seed: u64) -> Vec<u64> {
    let mut cdf = Vec::with_capacity(universe);
    let mut acc = 0.0;
    for i in 1..=universe {
        acc += (i as f64).powf(-alpha);
        cdf.push(acc);
    }
    let total = acc;
    let mut keys = vec![0u64; n];
    keys.par_chunks_mut(GEN_CHUNK)
        .enumerate()
        .for_each(|(chunk, out)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed ^ chunk as u64);
            for key in out.iter_mut() {
                let u = rng.random::<f64>() * total;
                *key = cdf.partition_point(|&c| c < u) as u64;
            }
        });
    keys
}

/// Wrap keys into records, using the input position as payload and leaving
/// the hashed key unset for [`semi_sort_with_hash`](crate::semi_sort_with_hash).
pub fn records_from_keys<K: Clone>(keys: &[K]) -> Vec<Record<usize, K>> {
    keys.iter()
        .cloned()
        .enumerate()
        .map(|(i, key)| Record {
            obj: i,
            key,
            hashed_key: 0,
        })
        .collect()
}

/// Verify that `output` is a semisort of `input`: every key's occurrences
/// form one contiguous run whose length equals the key's input frequency.
pub fn verify_frequency_runs<K>(input: &[K], output: &[K]) -> Result<(), SemiSortError>
where
    K: Eq + std::hash::Hash + std::fmt::Display,
{
    if input.len() != output.len() {
        return Err(SemiSortError::LengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }
    let mut frequency: FxHashMap<&K, usize> = FxHashMap::default();
    for key in input {
        *frequency.entry(key).or_insert(0) += 1;
    }

    let n = output.len();
    let mut i = 0;
    while i < n {
        let key = &output[i];
        let freq = match frequency.get_mut(key) {
            None => {
                return Err(SemiSortError::CheckFailed {
                    index: i,
                    detail: format!("key {key} does not appear in the input"),
                })
            }
            Some(f) if *f == 0 => {
                return Err(SemiSortError::CheckFailed {
                    index: i,
                    detail: format!("key {key} was already seen in an earlier run"),
                })
            }
            Some(f) => std::mem::replace(f, 0),
        };
        let end = i + freq;
        if end > n {
            return Err(SemiSortError::CheckFailed {
                index: i,
                detail: format!("run of key {key} (length {freq}) exceeds the sequence"),
            });
        }
        while i < end {
            if output[i] != *key {
                return Err(SemiSortError::CheckFailed {
                    index: i,
                    detail: format!("expected key {key}, found {}", output[i]),
                });
            }
            i += 1;
        }
    }
    Ok(())
}
