//! Sample sort, heavy/light classification, and bucket layout planning.

use itertools::Itertools;
use rdst::RadixSort;

use crate::error::SemiSortError;
use crate::table::Bucket;
use crate::{Plan, SemiSortParams};

/// The planned working-array layout: heavy buckets first, in classification
/// order, then every light bucket in index order. Slot ranges are contiguous
/// and pairwise disjoint; `offset_end` is the first slot past the last
/// bucket.
#[derive(Debug)]
pub(crate) struct Layout {
    pub buckets: Vec<Bucket>,
    pub num_heavy: usize,
    pub offset_end: usize,
}

/// Sort the sample, classify each sampled key as heavy or light, and size a
/// bucket for every heavy key and every light range.
pub(crate) fn plan_buckets(
    samples: &mut Vec<u64>,
    plan: &Plan,
    params: &SemiSortParams,
) -> Result<Layout, SemiSortError> {
    samples.radix_sort_unstable();

    let mut light_counts = vec![0u64; plan.num_light_buckets];
    let mut buckets = Vec::new();
    let mut offset: u64 = 0;

    for (count, &key) in samples.iter().dedup_with_count() {
        if count as f64 > plan.gamma {
            let size = bucket_capacity(count as u64, plan, params);
            let (offset32, size32) = checked_descriptor(offset, size)?;
            buckets.push(Bucket {
                bucket_id: key,
                offset: offset32,
                size: size32,
                is_heavy: true,
            });
            offset += size;
        } else {
            light_counts[plan.light_bucket_index(key)] += count as u64;
        }
    }
    let num_heavy = buckets.len();

    for (i, &count) in light_counts.iter().enumerate() {
        // An unsampled range still holds O(log^2 n) records w.h.p.; size it
        // as if one sample had been seen.
        let size = bucket_capacity(count.max(1), plan, params);
        let (offset32, size32) = checked_descriptor(offset, size)?;
        buckets.push(Bucket {
            bucket_id: i as u64 * plan.bucket_range,
            offset: offset32,
            size: size32,
            is_heavy: false,
        });
        offset += size;
    }

    Ok(Layout {
        buckets,
        num_heavy,
        offset_end: offset as usize,
    })
}

/// Bucket descriptors pack the offset into 32 bits and the size into 31; a
/// plan past either limit is reported, never truncated.
fn checked_descriptor(offset: u64, size: u64) -> Result<(u32, u32), SemiSortError> {
    if offset <= u32::MAX as u64 && size < 1 << 31 {
        Ok((offset as u32, size as u32))
    } else {
        Err(SemiSortError::LayoutOverflow {
            slots: offset.saturating_add(size),
        })
    }
}

/// Degenerate plan for inputs too small to sample: a single light bucket
/// holding everything, sized to keep the load factor below 1/1.1.
pub(crate) fn single_bucket_layout(plan: &Plan) -> Layout {
    let size = ((plan.n as u64 * 11).div_ceil(5)).next_power_of_two().max(2);
    Layout {
        buckets: vec![Bucket {
            bucket_id: 0,
            offset: 0,
            size: size as u32,
            is_heavy: false,
        }],
        num_heavy: 0,
        offset_end: size as usize,
    }
}

/// Slots for a bucket whose key (or key range) was sampled `sample_count`
/// times. The Chernoff upper tail on the true count, solved for the count,
/// with `L = Δ log2 n` the w.h.p. margin; 1.1 slack, then rounded up to a
/// power of two for cheap modular probing.
fn bucket_capacity(sample_count: u64, plan: &Plan, params: &SemiSortParams) -> u64 {
    let c = sample_count as f64;
    let l = params.delta_threshold * plan.logn;
    let raw = (c + l + (l * l + 2.0 * c * l * params.f_c).sqrt()) / plan.p;
    let padded = (1.1 * raw).ceil();
    if padded >= u32::MAX as f64 {
        // Past the descriptor packing limit; checked_descriptor reports it.
        return u64::MAX;
    }
    (padded as u64).max(1).next_power_of_two()
}
