//! Bloom-filter family
//!
//! A generic filter core parameterized by its backing store, plus three
//! stores giving three filter variants: plain bit-array membership
//! ([`BloomFilter`]), counting buckets that support removal
//! ([`CountingBloomFilter`]), and per-bucket timestamps answering "was this
//! key added within the last N seconds" ([`TimeoutBloomFilter`]).
//!
//! Bucket selection chains the seed through [`murmur3_32`]: each of the K
//! hash values reuses the previous value as its seed, so one hash function
//! yields the whole family. Sizing uses the standard Bloom formulas
//! `m = -n ln(e) / (ln 2)^2` and `k = (m / n) ln 2`.

mod bloom;
mod counting;
mod timeout;

pub use bloom::BitStore;
pub use counting::{Counter, CountingStore};
pub use timeout::TimeoutBloomFilter;

use std::f64::consts::LN_2;

use crate::error::{NetforgeError, Result};
use crate::hash::murmur3_32;

/// Plain set-membership Bloom filter over a packed bit array
pub type BloomFilter = GenericBloomFilter<BitStore>;

/// Bloom filter with counting buckets, supporting removal
pub type CountingBloomFilter<C = u8> = GenericBloomFilter<CountingStore<C>>;

/// Smallest store worth allocating
const MIN_FILTER_BUCKETS: usize = 8;
/// Beyond this, extra hashes cost more than they help
const MAX_HASH_FUNCTIONS: u32 = 16;

/// Compute `(buckets, hashes)` for an expected element count and a target
/// false-positive rate.
pub(crate) fn optimal_params(expected_elements: usize, fp_rate: f64) -> Result<(usize, u32)> {
    if !(fp_rate > 0.0 && fp_rate < 1.0) {
        return Err(NetforgeError::configuration(format!(
            "false positive rate must be in (0, 1), got {}",
            fp_rate
        )));
    }
    let n = expected_elements.max(1) as f64;
    let m = (-(n * fp_rate.ln()) / (LN_2 * LN_2))
        .ceil()
        .max(MIN_FILTER_BUCKETS as f64);
    let k = ((m / n) * LN_2)
        .round()
        .clamp(1.0, f64::from(MAX_HASH_FUNCTIONS)) as u32;
    Ok((m as usize, k))
}

/// Backing store for a Bloom filter: a fixed run of buckets that can be
/// marked, tested, cleared, and merged
pub trait FilterStore {
    /// Resize to hold `buckets` buckets, clearing all contents
    fn resize(&mut self, buckets: usize);

    /// Number of buckets
    fn len(&self) -> usize;

    /// Whether the store has no buckets
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear every bucket
    fn reset(&mut self);

    /// Mark bucket `n` according to the store's mechanism
    fn set(&mut self, n: usize);

    /// Whether bucket `n` is marked
    fn test(&self, n: usize) -> bool;

    /// Fold another store of the same size into this one
    fn merge_from(&mut self, other: &Self);
}

/// Generic Bloom filter over a pluggable [`FilterStore`]
///
/// Use the [`BloomFilter`] and [`CountingBloomFilter`] aliases unless you
/// are supplying your own store.
#[derive(Debug, Clone)]
pub struct GenericBloomFilter<S: FilterStore> {
    store: S,
    num_hashes: u32,
}

impl<S: FilterStore + Default> GenericBloomFilter<S> {
    /// Create a filter sized for `expected_elements` at the target
    /// false-positive rate
    pub fn new(expected_elements: usize, fp_rate: f64) -> Result<Self> {
        let (buckets, num_hashes) = optimal_params(expected_elements, fp_rate)?;
        let mut store = S::default();
        store.resize(buckets);
        Ok(Self { store, num_hashes })
    }
}

impl<S: FilterStore> GenericBloomFilter<S> {
    /// Add a key to the set
    pub fn add(&mut self, key: &[u8]) {
        let mut seed = 0u32;
        for _ in 0..self.num_hashes {
            let bucket = self.next_bucket(key, &mut seed);
            self.store.set(bucket);
        }
    }

    /// Test membership; false positives possible, false negatives not
    pub fn query(&self, key: &[u8]) -> bool {
        let mut seed = 0u32;
        for _ in 0..self.num_hashes {
            if !self.store.test(self.next_bucket(key, &mut seed)) {
                return false;
            }
        }
        true
    }

    /// Empty the set
    pub fn reset(&mut self) {
        self.store.reset();
    }

    /// Fold another filter's contents into this one
    ///
    /// Fails unless both filters share the same dimensions.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.store.len() != other.store.len() || self.num_hashes != other.num_hashes {
            return Err(NetforgeError::configuration(
                "cannot merge Bloom filters of different dimensions",
            ));
        }
        self.store.merge_from(&other.store);
        Ok(())
    }

    /// Number of buckets in the backing store
    pub fn buckets(&self) -> usize {
        self.store.len()
    }

    /// Number of hash probes per key
    pub fn hashes(&self) -> u32 {
        self.num_hashes
    }

    pub(crate) fn next_bucket(&self, key: &[u8], seed: &mut u32) -> usize {
        *seed = murmur3_32(key, *seed);
        *seed as usize % self.store.len()
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
