//! Lossy fixed-size hash table
//!
//! A fixed number of value buckets indexed by key hash. Distinct keys may
//! share a bucket, in which case the table "loses" the distinction; that is
//! the point of the structure. Useful for approximate per-key accumulators
//! (counters, rates) where bounded memory matters more than exactness.

use crate::error::{NetforgeError, Result};
use crate::hash::murmur3_32;

/// Fixed-size table mapping byte-string keys onto shared value buckets
#[derive(Debug, Clone)]
pub struct LossyHashTable<V> {
    buckets: Vec<V>,
}

impl<V: Clone + Default> LossyHashTable<V> {
    /// Create a table with `size` buckets, each default-initialized
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(NetforgeError::configuration(
                "lossy hash table needs at least one bucket",
            ));
        }
        Ok(Self {
            buckets: vec![V::default(); size],
        })
    }
}

impl<V> LossyHashTable<V> {
    /// The bucket a key maps to
    pub fn slot(&self, key: &[u8]) -> &V {
        &self.buckets[self.index(key)]
    }

    /// The bucket a key maps to, mutably
    pub fn slot_mut(&mut self, key: &[u8]) -> &mut V {
        let index = self.index(key);
        &mut self.buckets[index]
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the table has no buckets (never true for a constructed table)
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterate over all bucket values, e.g. to compute statistics
    pub fn values(&self) -> std::slice::Iter<'_, V> {
        self.buckets.iter()
    }

    /// Iterate mutably over all bucket values
    pub fn values_mut(&mut self) -> std::slice::IterMut<'_, V> {
        self.buckets.iter_mut()
    }

    fn index(&self, key: &[u8]) -> usize {
        murmur3_32(key, 0) as usize % self.buckets.len()
    }
}
