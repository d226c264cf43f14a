//! Concurrent open-addressed table mapping bucket ids to bucket descriptors.
//!
//! Inserts run in parallel during planning; finds run lock-free during the
//! scatter passes. Entries are never updated after insertion, and the two
//! phases are separated by a fork-join barrier, so a find always observes a
//! fully published entry.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::hash::C;

/// A contiguous slot range in the working array, reserved for one heavy key
/// or one light key range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bucket {
    /// The heavy hashed key, or `index * bucket_range` for a light bucket.
    pub bucket_id: u64,
    /// Start slot in the working array.
    pub offset: u32,
    /// Number of slots; a power of two below 2^31.
    pub size: u32,
    pub is_heavy: bool,
}

impl Bucket {
    pub const SENTINEL: Bucket = Bucket {
        bucket_id: 0,
        offset: 0,
        size: 0,
        is_heavy: false,
    };

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.size == 0
    }

    /// offset << 32 | size << 1 | heavy. `size < 2^31` keeps the packing exact.
    #[inline]
    fn payload(&self) -> u64 {
        debug_assert!(self.size < 1 << 31);
        (self.offset as u64) << 32 | (self.size as u64) << 1 | self.is_heavy as u64
    }

    #[inline]
    fn from_parts(bucket_id: u64, payload: u64) -> Bucket {
        Bucket {
            bucket_id,
            offset: (payload >> 32) as u32,
            size: (payload as u32) >> 1,
            is_heavy: payload & 1 == 1,
        }
    }
}

/// A heavy bucket id is a hashed key and can coincide with a light range
/// boundary `i * R`. Tagging the table key with the heavy bit keeps the two
/// namespaces disjoint; the `+ 1` keeps 0 as the empty-slot key even for the
/// light bucket at id 0. Ids stay below 2^62, so the shift cannot overflow.
#[inline]
fn table_key(bucket_id: u64, is_heavy: bool) -> u64 {
    (bucket_id << 1 | is_heavy as u64) + 1
}

#[inline]
fn mix(key: u64) -> u64 {
    let r = key as u128 * C as u128;
    (r as u64 ^ (r >> 64) as u64).wrapping_mul(C)
}

/// Open-addressed hash table with linear probing and a CAS-on-key protocol.
///
/// Capacity is at least twice the number of entries, so probe chains stay
/// short and `find` terminates at the first empty slot on a miss.
pub struct BucketTable {
    keys: Vec<AtomicU64>,
    payloads: Vec<AtomicU64>,
    mask: usize,
}

impl BucketTable {
    pub fn with_capacity(entries: usize) -> Self {
        let cap = (2 * entries.max(1)).next_power_of_two().max(8);
        BucketTable {
            keys: (0..cap).map(|_| AtomicU64::new(0)).collect(),
            payloads: (0..cap).map(|_| AtomicU64::new(0)).collect(),
            mask: cap - 1,
        }
    }

    /// Insert a bucket descriptor. Safe to call from many threads at once.
    /// A second insert with the same id is a no-op.
    pub fn insert(&self, bucket: &Bucket) {
        let key = table_key(bucket.bucket_id, bucket.is_heavy);
        let mut i = mix(key) as usize & self.mask;
        loop {
            match self.keys[i].compare_exchange(0, key, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    self.payloads[i].store(bucket.payload(), Ordering::Release);
                    return;
                }
                Err(found) if found == key => return,
                Err(_) => i = (i + 1) & self.mask,
            }
        }
    }

    /// Look up the bucket for `(bucket_id, is_heavy)`. Returns the sentinel on
    /// a miss. Must only run after all inserts have joined.
    #[inline]
    pub fn find(&self, bucket_id: u64, is_heavy: bool) -> Bucket {
        let key = table_key(bucket_id, is_heavy);
        let mut i = mix(key) as usize & self.mask;
        loop {
            match self.keys[i].load(Ordering::Acquire) {
                0 => return Bucket::SENTINEL,
                found if found == key => {
                    return Bucket::from_parts(bucket_id, self.payloads[i].load(Ordering::Acquire))
                }
                _ => i = (i + 1) & self.mask,
            }
        }
    }
}
