//! Counting backing store, enabling removal

use crate::filter::{FilterStore, GenericBloomFilter};

/// Bucket counter for a counting Bloom filter
///
/// Counters saturate at their maximum instead of wrapping; a saturated
/// bucket stays saturated, trading some removal accuracy for never
/// producing a false negative through overflow.
pub trait Counter: Copy + Eq {
    /// The empty-bucket value
    const ZERO: Self;

    /// Increment, saturating at the maximum
    fn increment(self) -> Self;

    /// Decrement; only called on non-zero counters
    fn decrement(self) -> Self;

    /// Add another counter's value, saturating
    fn saturating_combine(self, other: Self) -> Self;

    /// Whether the bucket holds anything
    fn is_set(self) -> bool;
}

macro_rules! impl_counter {
    ($($ty:ty),*) => {
        $(impl Counter for $ty {
            const ZERO: Self = 0;

            fn increment(self) -> Self {
                self.saturating_add(1)
            }

            fn decrement(self) -> Self {
                self.saturating_sub(1)
            }

            fn saturating_combine(self, other: Self) -> Self {
                self.saturating_add(other)
            }

            fn is_set(self) -> bool {
                self > 0
            }
        })*
    };
}

impl_counter!(u8, u16, u32);

/// Array of saturating counters, one per bucket
#[derive(Debug, Clone)]
pub struct CountingStore<C: Counter = u8> {
    counters: Vec<C>,
}

impl<C: Counter> Default for CountingStore<C> {
    fn default() -> Self {
        Self {
            counters: Vec::new(),
        }
    }
}

impl<C: Counter> FilterStore for CountingStore<C> {
    fn resize(&mut self, buckets: usize) {
        self.counters.clear();
        self.counters.resize(buckets, C::ZERO);
    }

    fn len(&self) -> usize {
        self.counters.len()
    }

    fn reset(&mut self) {
        self.counters.fill(C::ZERO);
    }

    fn set(&mut self, n: usize) {
        self.counters[n] = self.counters[n].increment();
    }

    fn test(&self, n: usize) -> bool {
        self.counters[n].is_set()
    }

    fn merge_from(&mut self, other: &Self) {
        for (counter, other_counter) in self.counters.iter_mut().zip(&other.counters) {
            *counter = counter.saturating_combine(*other_counter);
        }
    }
}

impl<C: Counter> CountingStore<C> {
    fn decrement(&mut self, n: usize) {
        self.counters[n] = self.counters[n].decrement();
    }
}

impl<C: Counter> GenericBloomFilter<CountingStore<C>> {
    /// Remove a key from the set
    ///
    /// Returns false without touching any bucket if the key is not present;
    /// only keys that were added may be removed, or other keys' counters
    /// would be corrupted.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        if !self.query(key) {
            return false;
        }
        let mut seed = 0u32;
        for _ in 0..self.hashes() {
            let bucket = self.next_bucket(key, &mut seed);
            self.store_mut().decrement(bucket);
        }
        true
    }
}
