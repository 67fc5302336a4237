//! Working-set-size estimation over chained Bloom filters
//!
//! The estimator keeps one Bloom filter per time interval, enough intervals
//! to span the working-set period. A key observed in no interval's filter is
//! new to the working set: its byte size is added to the current interval's
//! tally. Summing the interval tallies estimates the distinct bytes touched
//! within the window; [`best_guess`](WssEstimator::best_guess) additionally
//! compensates for the incomplete current interval and for the keys the
//! filters miscount as already-seen.
//!
//! Estimates err low: false positives suppress counting, and the newest
//! interval is always partial.

use std::collections::VecDeque;

use crate::error::{NetforgeError, Result};
use crate::filter::BloomFilter;

struct Interval {
    filter: BloomFilter,
    bytes: u64,
}

/// Estimator for the byte volume of distinct keys seen within a sliding
/// window of `num_intervals` intervals
pub struct WssEstimator {
    /// Newest interval at the front
    intervals: VecDeque<Interval>,
    window: u32,
    elements_per_interval: u32,
    fp_rate: f64,
    adaptive_buffer: f64,
    current_keys: u64,
    last_retired_bytes: u64,
}

impl WssEstimator {
    /// Create an estimator
    ///
    /// `num_intervals` filters cover the working-set period; call
    /// [`end_interval`](Self::end_interval) once per interval.
    /// `elements_per_interval` caps the distinct keys one filter is sized
    /// for; be generous, an undersized filter drives the false-positive
    /// rate above `fp_rate` and the estimate further down. A nonzero
    /// `adaptive_buffer` resizes each new filter to the previous interval's
    /// observed key count plus that fraction of slack, instead of the fixed
    /// cap.
    pub fn new(
        num_intervals: u32,
        elements_per_interval: u32,
        fp_rate: f64,
        adaptive_buffer: f64,
    ) -> Result<Self> {
        if num_intervals == 0 {
            return Err(NetforgeError::configuration(
                "working-set window needs at least one interval",
            ));
        }
        if adaptive_buffer < 0.0 {
            return Err(NetforgeError::configuration(
                "adaptive buffer fraction cannot be negative",
            ));
        }
        let first = BloomFilter::new(elements_per_interval as usize, fp_rate)?;
        let mut intervals = VecDeque::new();
        intervals.push_front(Interval {
            filter: first,
            bytes: 0,
        });
        Ok(Self {
            intervals,
            window: num_intervals,
            elements_per_interval,
            fp_rate,
            adaptive_buffer,
            current_keys: 0,
            last_retired_bytes: 0,
        })
    }

    /// Count `bytes` toward the working set if `key` has not been seen
    /// within the window
    pub fn observe(&mut self, key: &[u8], bytes: u64) {
        for interval in &self.intervals {
            if interval.filter.query(key) {
                return;
            }
        }
        // front() exists from construction onward
        if let Some(current) = self.intervals.front_mut() {
            current.filter.add(key);
            current.bytes += bytes;
            self.current_keys += 1;
        }
    }

    /// Close the current interval and start the next
    ///
    /// Call once per interval of the chosen resolution (for a 5-minute
    /// window at 1-minute resolution, once a minute). Retires the oldest
    /// interval once the window is full.
    pub fn end_interval(&mut self) -> Result<()> {
        let next_elements = if self.adaptive_buffer > 0.0 {
            // Predict the next interval from the one just finished, with
            // slack for growth and a floor for empty intervals.
            self.current_keys
                + (self.current_keys as f64 * self.adaptive_buffer) as u64
                + 20
        } else {
            u64::from(self.elements_per_interval)
        };

        let filter = BloomFilter::new(next_elements as usize, self.fp_rate)?;
        self.intervals.push_front(Interval { filter, bytes: 0 });

        if self.intervals.len() > self.window as usize {
            if let Some(oldest) = self.intervals.pop_back() {
                self.last_retired_bytes = oldest.bytes;
            }
        }
        self.current_keys = 0;
        Ok(())
    }

    /// Plain estimate: the sum of all interval tallies
    pub fn size(&self) -> u64 {
        self.intervals.iter().map(|i| i.bytes).sum()
    }

    /// Compensated estimate
    ///
    /// `interval_fraction` is how far the current interval has progressed,
    /// in `[0, 1]`. With a full window the current interval contributes
    /// proportionally and the just-retired interval fills in the remainder;
    /// with a partial window the observed data is scaled up to a full
    /// period. Either way the expected false-positive undercount is added
    /// back.
    pub fn best_guess(&self, interval_fraction: f64) -> u64 {
        let fraction = interval_fraction.clamp(0.0, 1.0);

        let mut estimate = if self.intervals.len() == self.window as usize {
            let older: u64 = self.intervals.iter().skip(1).map(|i| i.bytes).sum();
            let current = self.intervals.front().map_or(0, |i| i.bytes);
            older as f64
                + fraction * current as f64
                + (1.0 - fraction) * self.last_retired_bytes as f64
        } else {
            let total = self.size() as f64;
            let known = (self.intervals.len() as f64 - 1.0 + fraction) / f64::from(self.window);
            if known > 0.0 {
                total / known
            } else {
                total
            }
        };

        estimate += self.fp_rate * estimate;
        estimate.round() as u64
    }

    /// Total Bloom-filter buckets in use; memory footprint is roughly an
    /// eighth of this in bytes
    pub fn buckets(&self) -> u64 {
        self.intervals.iter().map(|i| i.filter.buckets() as u64).sum()
    }

    /// Number of intervals currently held, including the open one
    pub fn intervals_held(&self) -> usize {
        self.intervals.len()
    }
}
