//! Implementations of various key hashers to use with [`semi_sort_with_hash`](crate::semi_sort_with_hash).
//!
//! We provide:
//! - [`NoHash`]: does nothing -- only use on truly random keys.
//! - [`FastIntHash`] = [`FxHash`], which does a single wrapping multiplication and is good enough
//!   for most integer key distributions.
//! - [`StrongerIntHash`]: use this when the input keys are very regular, e.g. `0..1000`.
//!   Does a `u128` multiplication, xors the high and low word together, then multiplies once more.
//! - [`Xxh3Int`]: XXH3 with the integer type 'inlined' so that it optimizes better.
//!
//! In practice, prefer [`FastIntHash`] if it's good enough, and fall back to
//! [`StrongerIntHash`] or [`Xxh3Int`] for adversarial inputs.
//!
//! Any type implementing `Hasher` also works through the blanket impl, but it may be more
//! efficient to implement [`KeyHasher`] directly for your key type.

/// Wrapper trait for the hash functions that feed the semisort pipeline.
///
/// The hash value is folded into `[1, k]` by the hashing phase; the hasher
/// itself only needs to produce well-mixed 64 bits.
pub trait KeyHasher<Key: ?Sized>: Clone + Sync {
    fn hash(x: &Key, seed: u64) -> u64;
}

/// All external hashers work.
impl<Key: std::hash::Hash + ?Sized, H: core::hash::Hasher + Default + Clone + Sync> KeyHasher<Key>
    for H
{
    #[inline(always)]
    fn hash(x: &Key, seed: u64) -> u64 {
        let mut hasher = H::default();
        Key::hash(x, &mut hasher);
        hasher.finish() ^ seed
    }
}

// Aliases

/// A fast hash for sufficiently random integers. Uses [`fxhash::FxHasher64`].
pub type FastIntHash = fxhash::FxHasher64;
pub type FxHash = fxhash::FxHasher64;
/// Type alias for xxhash (XXH3) hasher.
///
/// Prefer [`Xxh3Int`] for integers, which avoids some overhead of the default hasher.
pub type Xxh3 = xxhash_rust::xxh3::Xxh3Default;

// Implementations

/// A sufficiently good hash for non-random integers. Inspired by Xxh3, with one extra
/// multiplication.
#[derive(Clone, Debug)]
pub struct StrongerIntHash;

/// Mixing constant.
pub const C: u64 = 0x517cc1b727220a95;

/// No hash at all; just `value ^ seed`. Use with caution. Mostly for benchmarking.
#[derive(Clone, Debug)]
pub struct NoHash;

/// Inlined version of Xxh3 for integer keys.
#[derive(Clone, Debug)]
pub struct Xxh3Int;

// Macro to implement hashes for all integer types.
macro_rules! int_hashers {
    ($($t:ty),*) => {
        $(
            impl KeyHasher<$t> for NoHash {
                #[inline(always)]
                fn hash(x: &$t, seed: u64) -> u64 {
                    *x as u64 ^ seed
                }
            }

            impl KeyHasher<$t> for StrongerIntHash {
                #[inline(always)]
                fn hash(x: &$t, seed: u64) -> u64 {
                    let r = (*x as u64 ^ seed) as u128 * C as u128;
                    let low = r as u64;
                    let high = (r >> 64) as u64;
                    (low ^ high).wrapping_mul(C)
                }
            }

            impl KeyHasher<$t> for Xxh3Int {
                #[inline(always)]
                fn hash(x: &$t, seed: u64) -> u64 {
                    xxhash_rust::xxh3::xxh3_64_with_seed(&(*x as u64).to_le_bytes(), seed)
                }
            }
        )*
    };
}
int_hashers!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
