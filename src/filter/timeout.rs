//! Timeout Bloom filter: membership within a time window
//!
//! Buckets hold the timestamp of the most recent add that touched them, so
//! a query can ask "was this key added within the last `timeout` seconds"
//! rather than "was it ever added". Timestamps are caller-supplied unix
//! seconds; the filter imposes no clock of its own.

use crate::error::{NetforgeError, Result};
use crate::filter::optimal_params;
use crate::hash::murmur3_32;

/// Bloom filter whose entries expire after a caller-chosen timeout
#[derive(Debug, Clone)]
pub struct TimeoutBloomFilter {
    stamps: Vec<u64>,
    num_hashes: u32,
}

impl TimeoutBloomFilter {
    /// Create a filter sized for `expected_elements` at the target
    /// false-positive rate
    pub fn new(expected_elements: usize, fp_rate: f64) -> Result<Self> {
        let (buckets, num_hashes) = optimal_params(expected_elements, fp_rate)?;
        Ok(Self {
            stamps: vec![0; buckets],
            num_hashes,
        })
    }

    /// Record the key as seen at time `now`
    pub fn add(&mut self, key: &[u8], now: u64) {
        let mut seed = 0u32;
        for _ in 0..self.num_hashes {
            let bucket = self.next_bucket(key, &mut seed);
            // Later adds only ever push a bucket's stamp forward.
            self.stamps[bucket] = self.stamps[bucket].max(now);
        }
    }

    /// Whether the key was seen within `timeout_secs` of `now`
    ///
    /// False positives are possible as in any Bloom filter; an entry older
    /// than the timeout reads as absent.
    pub fn query(&self, key: &[u8], now: u64, timeout_secs: u64) -> bool {
        let cutoff = now.saturating_sub(timeout_secs);
        let mut seed = 0u32;
        for _ in 0..self.num_hashes {
            let bucket = self.next_bucket(key, &mut seed);
            if self.stamps[bucket] < cutoff {
                return false;
            }
        }
        true
    }

    /// Forget everything
    pub fn reset(&mut self) {
        self.stamps.fill(0);
    }

    /// Fold another filter's stamps into this one, keeping the newer stamp
    /// per bucket
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.stamps.len() != other.stamps.len() || self.num_hashes != other.num_hashes {
            return Err(NetforgeError::configuration(
                "cannot merge timeout Bloom filters of different dimensions",
            ));
        }
        for (stamp, other_stamp) in self.stamps.iter_mut().zip(&other.stamps) {
            *stamp = (*stamp).max(*other_stamp);
        }
        Ok(())
    }

    /// Number of buckets
    pub fn buckets(&self) -> usize {
        self.stamps.len()
    }

    /// Number of hash probes per key
    pub fn hashes(&self) -> u32 {
        self.num_hashes
    }

    fn next_bucket(&self, key: &[u8], seed: &mut u32) -> usize {
        *seed = murmur3_32(key, *seed);
        *seed as usize % self.stamps.len()
    }
}
