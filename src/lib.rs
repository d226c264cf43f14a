//! # Parallel semisort
//!
//! Reorders a sequence of records so that all records sharing the same hashed
//! key occupy one contiguous run, without imposing any order between runs.
//! Semisort is strictly weaker than sort, which is exactly what makes it
//! faster: a small uniform sample discovers the heavy keys, every heavy key
//! and every light key range gets a bucket sized for its sampled frequency,
//! and records are scattered into their buckets lock-free with one CAS per
//! slot.
//!
//! The pipeline, leaves first: hash, sample, sample sort, classify,
//! plan buckets, scatter heavy, scatter light + per-bucket order, pack.
//!
//! The algorithm is Las Vegas: the output is always a valid semisort, and the
//! sizing constants make a bucket overflow an `n^-c` probability event.
//! [`semi_sort`] panics on overflow; [`try_semi_sort`] surfaces it as an
//! error instead.
//!
//! Usage example:
//! ```rust
//! use semisort::hash::FastIntHash;
//! use semisort::util::records_from_keys;
//! use semisort::{semi_sort_with_hash, SemiSortParams};
//!
//! let keys: Vec<u64> = vec![3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
//! let mut records = records_from_keys(&keys);
//! semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &SemiSortParams::default());
//!
//! // Equal keys now sit in contiguous runs: every hashed key forms
//! // exactly one run, and no record was lost.
//! assert_eq!(records.len(), keys.len());
//! let mut seen = std::collections::HashSet::new();
//! for run in records.chunk_by(|a, b| a.hashed_key == b.hashed_key) {
//!     assert!(seen.insert(run[0].hashed_key));
//! }
//! ```
//!
//! ## Hash functions
//!
//! [`semi_sort_with_hash`] derives each record's hashed key with a
//! [`hash::KeyHasher`]. Prefer [`hash::FastIntHash`] for integers and fall
//! back to [`hash::StrongerIntHash`] or [`hash::Xxh3Int`] for very regular
//! key sets. [`semi_sort`] skips hashing and trusts the caller-supplied
//! hashed keys.
//!
//! ## Tuning
//!
//! [`SemiSortParams`] exposes the sampling, classification, and sizing
//! constants. The defaults are chosen so that every bucket over-provisions
//! its Chernoff bound and scatter probing stays O(1) expected; prefer
//! [`SemiSortParams::default()`] unless you are studying the algorithm.

pub mod error;
pub mod hash;
pub mod seq_io;
/// Test-data generators and the run/frequency checker. Exposed for
/// testing and benchmarking purposes.
pub mod util;

mod classify;
mod pack;
mod sample;
mod scatter;
mod stats;
mod table;
#[cfg(test)]
mod test;

use std::time::Instant;

use log::trace;
use rayon::prelude::*;

pub use error::SemiSortError;
pub use stats::SemiSortStats;

use crate::hash::KeyHasher;
use crate::scatter::SlotArray;
use crate::table::BucketTable;
use crate::util::log_duration;

/// A semisortable record: an opaque payload, its domain key, and the derived
/// 64-bit hashed key.
///
/// `hashed_key == 0` marks an empty slot and is never a legal hashed key; the
/// hashing phase maps into `[1, k]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record<O, K> {
    pub obj: O,
    pub key: K,
    pub hashed_key: u64,
}

impl<O, K> Record<O, K> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hashed_key == 0
    }
}

/// Tuning constants for [`semi_sort`].
///
/// While all fields are public, prefer [`SemiSortParams::default()`] or
/// [`SemiSortParams::default_legacy()`].
#[derive(Clone, Copy, Debug)]
pub struct SemiSortParams {
    /// Hash range exponent `K`: hashed keys live in `[1, n^K]`. Keeping
    /// `K > 2` makes cross-key hash collisions negligible, which the heavy
    /// key detection relies on.
    pub hash_range_k: f64,
    /// `C_s` in the sampling probability `p = min(C_s / log2 n, 0.25)`.
    pub sample_probability_constant: f64,
    /// `Δ` in the heavy threshold `γ = Δ log2 n` and the w.h.p. margin of
    /// the bucket capacity formula.
    pub delta_threshold: f64,
    /// Chernoff slack constant in the bucket capacity formula.
    pub f_c: f64,
    /// `C_L` in the light bucket count `B = ⌈C_L (n / log² n + 1)⌉`.
    pub light_key_bucket_constant: f64,
    /// Upper bound on the number of chunks used by the final pack.
    pub pack_partitions: usize,
    /// Seeds hashing, sampling, and scatter placement.
    pub seed: u64,
}

impl SemiSortParams {
    /// The current tuning; samples `3 / log2 n` of the input.
    pub fn default_current() -> Self {
        Self {
            hash_range_k: 2.25,
            sample_probability_constant: 3.0,
            delta_threshold: 1.0,
            f_c: 1.25,
            light_key_bucket_constant: 2.0,
            pack_partitions: 1000,
            seed: 31415,
        }
    }

    /// The legacy tuning: a `1 / log2 n` sampling rate. Cheaper sampling,
    /// coarser heavy-key detection.
    pub fn default_legacy() -> Self {
        Self {
            sample_probability_constant: 1.0,
            ..Self::default_current()
        }
    }
}

impl Default for SemiSortParams {
    fn default() -> Self {
        Self::default_current()
    }
}

/// Derived sizing state shared by all phases.
pub(crate) struct Plan {
    pub n: usize,
    /// log2(n): the unit of partition length, thresholds, and margins.
    pub logn: f64,
    /// Sampling probability.
    pub p: f64,
    pub num_samples: usize,
    /// Hashed keys live in `[1, hash_range]`.
    pub hash_range: u64,
    /// Heavy threshold `γ`.
    pub gamma: f64,
    pub num_light_buckets: usize,
    /// Width `R` of a light bucket's hashed-key interval.
    pub bucket_range: u64,
    /// Records per scatter task.
    pub partition_len: usize,
}

impl Plan {
    pub(crate) fn new(n: usize, params: &SemiSortParams) -> Plan {
        let logn = (n as f64).log2();
        let p = (params.sample_probability_constant / logn).min(0.25);
        let num_samples = ((n as f64 * p).floor() as usize).saturating_sub(1);
        let hash_range = hash_range(n, params.hash_range_k);
        // With no usable sample, everything goes into a single light bucket.
        let num_light_buckets = if num_samples == 0 {
            1
        } else {
            (params.light_key_bucket_constant * (n as f64 / (logn * logn) + 1.0)).ceil() as usize
        };
        Plan {
            n,
            logn,
            p,
            num_samples,
            hash_range,
            gamma: params.delta_threshold * logn,
            num_light_buckets,
            bucket_range: (hash_range / num_light_buckets as u64).max(1),
            partition_len: (logn as usize).max(1),
        }
    }

    /// `R = k / B` is truncated, so the top of the hash range can spill past
    /// the last bucket; clamping keeps the record-to-bucket mapping total.
    /// Planning and scatter both go through here.
    #[inline]
    pub fn light_bucket_index(&self, hashed_key: u64) -> usize {
        ((hashed_key / self.bucket_range) as usize).min(self.num_light_buckets - 1)
    }

    #[inline]
    pub fn light_bucket_id(&self, hashed_key: u64) -> u64 {
        self.light_bucket_index(hashed_key) as u64 * self.bucket_range
    }

    fn log(&self) {
        trace!("        keys: {:>10}", self.n);
        trace!("  hash range: {:>10}", self.hash_range);
        trace!("           p: {:>10.4}", self.p);
        trace!("       gamma: {:>10.2}", self.gamma);
        trace!("bucket range: {:>10}", self.bucket_range);
    }
}

/// `k = floor(n^K)`, capped below 2^62 so tagged bucket-table keys cannot
/// overflow.
pub(crate) fn hash_range(n: usize, k_exp: f64) -> u64 {
    const MAX: u64 = 1 << 62;
    let k = (n as f64).powf(k_exp);
    if k >= MAX as f64 {
        MAX
    } else {
        (k as u64).max(1)
    }
}

/// Hash every key into `[1, n^K]`, then semisort.
pub fn semi_sort_with_hash<Hx, O, K>(records: &mut [Record<O, K>], params: &SemiSortParams)
where
    Hx: KeyHasher<K>,
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    let k = hash_range(records.len(), params.hash_range_k);
    let seed = params.seed;
    records.par_iter_mut().for_each(|rec| {
        rec.hashed_key = Hx::hash(&rec.key, seed) % k + 1;
    });
    semi_sort(records, params);
}

/// Permute `records` so that equal hashed keys occupy contiguous runs.
///
/// Every record's `hashed_key` must already be set and nonzero; use
/// [`semi_sort_with_hash`] to derive them first.
///
/// Panics on bucket overflow (an `n^-c` event under the default constants)
/// and on inputs too large for the 32-bit slot addressing of the bucket
/// descriptors. Use [`try_semi_sort`] to handle both as errors instead.
pub fn semi_sort<O, K>(records: &mut [Record<O, K>], params: &SemiSortParams)
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    try_semi_sort(records, params)
        .expect("semisort failed; switch to try_semi_sort to handle the error")
}

/// Fallible version of [`semi_sort`].
pub fn try_semi_sort<O, K>(
    records: &mut [Record<O, K>],
    params: &SemiSortParams,
) -> Result<(), SemiSortError>
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    try_semi_sort_with_stats(records, params).map(|_| ())
}

/// Version that returns plan statistics.
#[doc(hidden)]
pub fn try_semi_sort_with_stats<O, K>(
    records: &mut [Record<O, K>],
    params: &SemiSortParams,
) -> Result<SemiSortStats, SemiSortError>
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    let n = records.len();
    if n == 0 {
        return Ok(SemiSortStats::default());
    }
    let overall = Instant::now();
    let plan = Plan::new(n, params);
    plan.log();

    let mut start = Instant::now();
    let layout = if plan.num_samples == 0 {
        classify::single_bucket_layout(&plan)
    } else {
        let mut samples = sample::sample_hashed_keys(records, &plan, params.seed);
        start = log_duration("sample", start);
        let layout = classify::plan_buckets(&mut samples, &plan, params)?;
        start = log_duration("classify", start);
        layout
    };

    let stats = SemiSortStats {
        n,
        num_samples: plan.num_samples,
        heavy_buckets: layout.num_heavy,
        light_buckets: layout.buckets.len() - layout.num_heavy,
        slots: layout.offset_end + n,
    };
    stats.log();

    let table = BucketTable::with_capacity(layout.buckets.len());
    layout.buckets.par_iter().for_each(|b| table.insert(b));
    start = log_duration("publish", start);

    // The working array carries an n-slot tail slack past the last bucket.
    let mut slots = SlotArray::new(layout.offset_end + n);
    {
        let writer = slots.writer();
        if layout.num_heavy > 0 {
            scatter::scatter_heavy(records, &writer, &table, &plan, params)?;
        }
        scatter::scatter_light(records, &writer, &table, &plan, params)?;
    }
    start = log_duration("scatter", start);

    pack::sort_light_buckets(&mut slots, &layout);
    start = log_duration("sort light", start);

    pack::pack_into(records, &mut slots, params.pack_partitions);
    log_duration("pack", start);
    log_duration("total", overall);
    Ok(stats)
}
