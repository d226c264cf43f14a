//! Per-light-bucket ordering and the final pack back into the input.

use std::mem::{self, MaybeUninit};
use std::sync::atomic::AtomicU64;

use rayon::prelude::*;

use crate::classify::Layout;
use crate::scatter::SlotArray;
use crate::Record;

/// Sort each light bucket by hashed key and compact its records to the
/// bucket's prefix. Heavy buckets hold a single hashed key and need neither.
pub(crate) fn sort_light_buckets<O, K>(slots: &mut SlotArray<O, K>, layout: &Layout)
where
    O: Send,
    K: Send,
{
    let light = &layout.buckets[layout.num_heavy..];
    let Some(first) = light.first() else { return };

    let (claims, records) = slots.parts_mut();
    let light_start = first.offset as usize;
    let (_, mut claims_rest) = claims.split_at_mut(light_start);
    let (_, mut records_rest) = records.split_at_mut(light_start);

    // Light buckets are contiguous and in offset order, so the region splits
    // cleanly into one mutable view per bucket.
    let mut views = Vec::with_capacity(light.len());
    for bucket in light {
        let size = bucket.size as usize;
        let (c, c_rest) = claims_rest.split_at_mut(size);
        let (r, r_rest) = records_rest.split_at_mut(size);
        claims_rest = c_rest;
        records_rest = r_rest;
        views.push((c, r));
    }

    views.into_par_iter().for_each(|(claims, records)| {
        let filled = compact_slots(claims, records);
        // The compacted prefix is initialized.
        let recs = unsafe {
            std::slice::from_raw_parts_mut(records.as_mut_ptr() as *mut Record<O, K>, filled)
        };
        recs.sort_unstable_by_key(|r| r.hashed_key);
        // The sort permuted the records; the claim words must follow.
        for (claim, rec) in claims.iter_mut().zip(recs.iter()) {
            *claim.get_mut() = rec.hashed_key;
        }
    });
}

/// Compact the working array into `arr`: each of `P = min(num_partitions,
/// |A'|)` chunks compacts in place, a short sequential prefix sum assigns
/// output offsets, then every chunk copies its prefix out in parallel.
pub(crate) fn pack_into<O, K>(
    arr: &mut [Record<O, K>],
    slots: &mut SlotArray<O, K>,
    num_partitions: usize,
) where
    O: Send,
    K: Send,
{
    let len = slots.len();
    if len == 0 {
        return;
    }
    let partitions = num_partitions.min(len).max(1);
    let chunk_len = len.div_ceil(partitions);
    let (claims, records) = slots.parts_mut();

    let counts: Vec<usize> = claims
        .par_chunks_mut(chunk_len)
        .zip(records.par_chunks_mut(chunk_len))
        .map(|(c, r)| compact_slots(c, r))
        .collect();

    let total: usize = counts.iter().sum();
    assert_eq!(
        total,
        arr.len(),
        "record conservation violated: {} in, {} scattered",
        arr.len(),
        total
    );

    let mut outputs = Vec::with_capacity(counts.len());
    let mut rest: &mut [Record<O, K>] = arr;
    for &count in &counts {
        let (head, tail) = rest.split_at_mut(count);
        outputs.push(head);
        rest = tail;
    }

    claims
        .par_chunks_mut(chunk_len)
        .zip(records.par_chunks_mut(chunk_len))
        .zip(outputs.into_par_iter())
        .for_each(|((claims, records), out)| {
            for i in 0..out.len() {
                // Moving a record out clears its claim so the working array
                // drops clean.
                out[i] = unsafe { records[i].assume_init_read() };
                *claims[i].get_mut() = 0;
            }
        });
}

/// Move claimed records to the range's prefix, left to right, leaving empty
/// slots at the tail. Returns the number of filled slots.
fn compact_slots<O, K>(
    claims: &mut [AtomicU64],
    records: &mut [MaybeUninit<Record<O, K>>],
) -> usize {
    let mut write = 0;
    for read in 0..claims.len() {
        let hashed_key = *claims[read].get_mut();
        if hashed_key != 0 {
            if read != write {
                let rec = mem::replace(&mut records[read], MaybeUninit::uninit());
                records[write] = rec;
                *claims[write].get_mut() = hashed_key;
                *claims[read].get_mut() = 0;
            }
            write += 1;
        }
    }
    write
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Bucket;

    fn record(key: u64) -> Record<usize, u64> {
        Record {
            obj: key as usize,
            key,
            hashed_key: key,
        }
    }

    fn fill(slots: &mut SlotArray<usize, u64>, entries: &[(usize, u64)]) {
        let writer = slots.writer();
        for &(idx, key) in entries {
            assert!(writer.try_claim(idx, key));
            unsafe { writer.write(idx, record(key)) };
        }
    }

    #[test]
    fn compact_preserves_order_of_survivors() {
        let mut slots: SlotArray<usize, u64> = SlotArray::new(8);
        fill(&mut slots, &[(1, 10), (3, 11), (6, 12)]);
        let (claims, records) = slots.parts_mut();
        let filled = compact_slots(claims, records);
        assert_eq!(filled, 3);
        let keys: Vec<u64> = (0..filled).map(|i| *claims[i].get_mut()).collect();
        assert_eq!(keys, vec![10, 11, 12]);
        assert!((filled..8).all(|i| *claims[i].get_mut() == 0));
    }

    #[test]
    fn sort_light_buckets_orders_each_bucket() {
        // Two light buckets of 4 slots each, scattered out of order.
        let layout = Layout {
            buckets: vec![
                Bucket {
                    bucket_id: 0,
                    offset: 0,
                    size: 4,
                    is_heavy: false,
                },
                Bucket {
                    bucket_id: 100,
                    offset: 4,
                    size: 4,
                    is_heavy: false,
                },
            ],
            num_heavy: 0,
            offset_end: 8,
        };
        let mut slots: SlotArray<usize, u64> = SlotArray::new(8);
        fill(&mut slots, &[(0, 9), (2, 3), (3, 9), (5, 120), (7, 101)]);
        sort_light_buckets(&mut slots, &layout);

        let (claims, _) = slots.parts_mut();
        let keys: Vec<u64> = (0..8).map(|i| *claims[i].get_mut()).collect();
        assert_eq!(keys, vec![3, 9, 9, 0, 101, 120, 0, 0]);
    }

    #[test]
    fn pack_compacts_everything_into_the_input() {
        let mut slots: SlotArray<usize, u64> = SlotArray::new(64);
        let placed: Vec<(usize, u64)> = vec![(2, 5), (9, 5), (17, 7), (40, 2), (63, 9)];
        fill(&mut slots, &placed);
        let mut arr: Vec<Record<usize, u64>> = (0..5).map(|_| record(0)).collect();
        pack_into(&mut arr, &mut slots, 4);

        let mut keys: Vec<u64> = arr.iter().map(|r| r.hashed_key).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![2, 5, 5, 7, 9]);
        // All slots were drained.
        let (claims, _) = slots.parts_mut();
        assert!((0..64).all(|i| *claims[i].get_mut() == 0));
    }
}
