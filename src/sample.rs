//! Uniform sampling of hashed keys.

use rayon::prelude::*;

use crate::hash::C;
use crate::{Plan, Record};

const SAMPLE_CHUNK: usize = 4096;

/// Draw `num_samples` hashed keys from the input. Stratified: sample slot `i`
/// reads near index `i / p`, jittered within the sample window, so every
/// region of the input is covered and the per-key sample count concentrates
/// binomially around `p * frequency`.
pub(crate) fn sample_hashed_keys<O, K>(arr: &[Record<O, K>], plan: &Plan, seed: u64) -> Vec<u64>
where
    O: Sync,
    K: Sync,
{
    let n = plan.n;
    let m = plan.num_samples;
    let mut samples = vec![0u64; m];
    samples
        .par_chunks_mut(SAMPLE_CHUNK)
        .enumerate()
        .for_each(|(chunk, out)| {
            let mut rng = fastrand::Rng::with_seed(seed ^ (chunk as u64).wrapping_mul(C));
            let base = chunk * SAMPLE_CHUNK;
            for (j, slot) in out.iter_mut().enumerate() {
                let stride = ((base + j) as f64 / plan.p) as usize;
                let idx = (stride + rng.usize(..m)) % n;
                *slot = arr[idx].hashed_key;
            }
        });
    samples
}
