//! Parallel scatter of records into their reserved buckets.
//!
//! The working array is split into an atomic claim word per slot and a plain
//! record store, so the CAS never races with the record write: a slot is
//! claimed by exactly one task, and the claim word is the only cross-task
//! channel. The phase join publishes the record writes to later phases.

use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::error::SemiSortError;
use crate::hash::C;
use crate::table::{Bucket, BucketTable};
use crate::{Plan, Record, SemiSortParams};

/// Probes per record are bounded at `PROBE_LIMIT_FACTOR * size + 64`. The
/// sizing formula keeps every bucket's load factor below 1/1.1, giving O(1)
/// expected probes; exhausting the bound means the plan undersized a bucket.
const PROBE_LIMIT_FACTOR: usize = 16;

const HEAVY_PASS_SALT: u64 = 0x9e37_79b9_7f4a_7c15;
const LIGHT_PASS_SALT: u64 = 0xd1b5_4a32_d192_ed03;

/// The working array `A'`: one atomic claim word (the slot's hashed key, 0 =
/// empty) plus the record itself. A slot's record is initialized iff its
/// claim word is nonzero.
pub(crate) struct SlotArray<O, K> {
    claims: Vec<AtomicU64>,
    records: Vec<MaybeUninit<Record<O, K>>>,
}

impl<O, K> SlotArray<O, K> {
    pub fn new(len: usize) -> Self {
        SlotArray {
            claims: (0..len).map(|_| AtomicU64::new(0)).collect(),
            records: (0..len).map(|_| MaybeUninit::uninit()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Shared view used during the scatter passes.
    pub fn writer(&mut self) -> SlotWriter<'_, O, K> {
        SlotWriter {
            claims: &self.claims,
            records: self.records.as_mut_ptr(),
            len: self.records.len(),
        }
    }

    /// Exclusive view used by the single-owner phases after scatter joins.
    pub fn parts_mut(&mut self) -> (&mut [AtomicU64], &mut [MaybeUninit<Record<O, K>>]) {
        (&mut self.claims, &mut self.records)
    }
}

impl<O, K> Drop for SlotArray<O, K> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<Record<O, K>>() {
            return;
        }
        for (claim, rec) in self.claims.iter_mut().zip(self.records.iter_mut()) {
            if *claim.get_mut() != 0 {
                // Claimed slots hold initialized records.
                unsafe { rec.assume_init_drop() };
            }
        }
    }
}

pub(crate) struct SlotWriter<'a, O, K> {
    claims: &'a [AtomicU64],
    records: *mut MaybeUninit<Record<O, K>>,
    len: usize,
}

// Each slot is written by exactly one task: the CAS winner.
unsafe impl<O: Send + Sync, K: Send + Sync> Sync for SlotWriter<'_, O, K> {}

impl<O, K> SlotWriter<'_, O, K> {
    /// Reserve `idx` for `hashed_key`. Relaxed is enough: the claim word is
    /// the only cross-task channel during scatter, and the phase join orders
    /// the record writes for the next phase.
    #[inline]
    pub(crate) fn try_claim(&self, idx: usize, hashed_key: u64) -> bool {
        let claim = &self.claims[idx];
        claim.load(Ordering::Relaxed) == 0
            && claim
                .compare_exchange(0, hashed_key, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
    }

    /// Store the record into a slot previously claimed by this task.
    #[inline]
    pub(crate) unsafe fn write(&self, idx: usize, record: Record<O, K>) {
        debug_assert!(idx < self.len);
        self.records.add(idx).write(MaybeUninit::new(record));
    }
}

/// Heavy pass: records whose hashed key owns a heavy bucket go to it; all
/// other records are left for the light pass.
pub(crate) fn scatter_heavy<O, K>(
    arr: &[Record<O, K>],
    writer: &SlotWriter<'_, O, K>,
    table: &BucketTable,
    plan: &Plan,
    params: &SemiSortParams,
) -> Result<(), SemiSortError>
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    scatter_pass(arr, writer, plan, params, HEAVY_PASS_SALT, |rec| {
        let bucket = table.find(rec.hashed_key, true);
        (!bucket.is_sentinel()).then_some(bucket)
    })
}

/// Light pass: records with no heavy match go to the range bucket of their
/// hashed key.
pub(crate) fn scatter_light<O, K>(
    arr: &[Record<O, K>],
    writer: &SlotWriter<'_, O, K>,
    table: &BucketTable,
    plan: &Plan,
    params: &SemiSortParams,
) -> Result<(), SemiSortError>
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
{
    scatter_pass(arr, writer, plan, params, LIGHT_PASS_SALT, |rec| {
        if !table.find(rec.hashed_key, true).is_sentinel() {
            return None;
        }
        let bucket = table.find(plan.light_bucket_id(rec.hashed_key), false);
        debug_assert!(!bucket.is_sentinel(), "every hashed key has a light bucket");
        Some(bucket)
    })
}

fn scatter_pass<O, K, F>(
    arr: &[Record<O, K>],
    writer: &SlotWriter<'_, O, K>,
    plan: &Plan,
    params: &SemiSortParams,
    salt: u64,
    route: F,
) -> Result<(), SemiSortError>
where
    O: Clone + Send + Sync,
    K: Clone + Send + Sync,
    F: Fn(&Record<O, K>) -> Option<Bucket> + Sync,
{
    arr.par_chunks(plan.partition_len)
        .enumerate()
        .try_for_each(|(partition, chunk)| {
            let mut rng =
                fastrand::Rng::with_seed(params.seed ^ salt ^ (partition as u64).wrapping_mul(C));
            for rec in chunk {
                if let Some(bucket) = route(rec) {
                    insert_record(writer, &bucket, rec, &mut rng)?;
                }
            }
            Ok(())
        })
}

/// Random slot, then linear probing; wrap re-picks a random slot. The random
/// start keeps expected probes O(1) at the planned load factor.
fn insert_record<O, K>(
    writer: &SlotWriter<'_, O, K>,
    bucket: &Bucket,
    rec: &Record<O, K>,
    rng: &mut fastrand::Rng,
) -> Result<(), SemiSortError>
where
    O: Clone,
    K: Clone,
{
    let offset = bucket.offset as usize;
    let size = bucket.size as usize;
    let end = offset + size;
    let limit = PROBE_LIMIT_FACTOR * size + 64;

    let mut idx = offset + rng.usize(..size);
    let mut attempts = 0;
    loop {
        if writer.try_claim(idx, rec.hashed_key) {
            unsafe { writer.write(idx, rec.clone()) };
            return Ok(());
        }
        attempts += 1;
        if attempts >= limit {
            return Err(SemiSortError::BucketOverflow {
                bucket_id: bucket.bucket_id,
                offset: bucket.offset,
                size: bucket.size,
                attempts,
            });
        }
        idx += 1;
        if idx == end {
            idx = offset + rng.usize(..size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let mut slots: SlotArray<(), u64> = SlotArray::new(4);
        let writer = slots.writer();
        assert!(writer.try_claim(2, 7));
        assert!(!writer.try_claim(2, 7));
        assert!(writer.try_claim(3, 7));
        unsafe {
            writer.write(
                2,
                Record {
                    obj: (),
                    key: 1,
                    hashed_key: 7,
                },
            );
            writer.write(
                3,
                Record {
                    obj: (),
                    key: 2,
                    hashed_key: 7,
                },
            );
        }
        drop(writer);
        let (claims, _) = slots.parts_mut();
        assert_eq!(*claims[2].get_mut(), 7);
        assert_eq!(*claims[0].get_mut(), 0);
    }

    #[test]
    fn overflow_is_detected() {
        let mut slots: SlotArray<(), u64> = SlotArray::new(2);
        let writer = slots.writer();
        let bucket = Bucket {
            bucket_id: 9,
            offset: 0,
            size: 2,
            is_heavy: true,
        };
        let rec = Record {
            obj: (),
            key: 9u64,
            hashed_key: 9,
        };
        let mut rng = fastrand::Rng::with_seed(1);
        insert_record(&writer, &bucket, &rec, &mut rng).unwrap();
        insert_record(&writer, &bucket, &rec, &mut rng).unwrap();
        let err = insert_record(&writer, &bucket, &rec, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            SemiSortError::BucketOverflow { bucket_id: 9, .. }
        ));
    }
}
