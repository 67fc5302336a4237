//! Watermarked resource pool
//!
//! Resources are created on demand through a [`ResourceFactory`] and handed
//! to callers by value: while checked out, the caller owns the resource
//! exclusively; `release` moves it back. The pool never exceeds its high
//! watermark and never retains fewer than its low watermark, with a
//! [`SizingPolicy`](super::SizingPolicy) deciding the steps in between.

use std::sync::Mutex;

use crate::error::{NetforgeError, Result};
use crate::pool::policy::{BasicPolicy, SizingPolicy};

/// Factory for pooled resources
///
/// `recycle` runs on every resource right after it is created and every time
/// it is returned to the pool, and is the place to re-bind a resource to
/// pool-wide context (the thread pool re-targets completion channels here) or
/// to reset per-checkout state.
pub trait ResourceFactory {
    /// The pooled resource type
    type Resource;

    /// Create one new resource
    fn create(&self) -> Result<Self::Resource>;

    /// Re-initialize a freshly created or just-returned resource
    fn recycle(&self, _resource: &mut Self::Resource) {}
}

struct PoolInner<R> {
    /// Resources currently available for checkout
    open: Vec<R>,
    /// Total live resources, checked out or not
    allocated: u32,
}

/// Thread-safe pool of reusable resources with low/high watermarks
///
/// `fetch` returns `Ok(None)` when the pool is at its high watermark with
/// every resource checked out; that is backpressure, not an error, and the
/// caller should queue and retry after a `release`.
///
/// The pool does not track checked-out resources. Ownership makes a double
/// release impossible, but a caller that drops a fetched resource instead of
/// releasing it permanently consumes one slot of the `allocated` accounting.
pub struct ResourcePool<F: ResourceFactory, P: SizingPolicy = BasicPolicy> {
    factory: F,
    policy: P,
    wm_low: u32,
    wm_high: u32,
    inner: Mutex<PoolInner<F::Resource>>,
}

impl<F: ResourceFactory> ResourcePool<F, BasicPolicy> {
    /// Create a pool with the default sizing policy
    pub fn new(factory: F, low_watermark: u32, high_watermark: u32) -> Result<Self> {
        Self::with_policy(factory, BasicPolicy, low_watermark, high_watermark)
    }
}

impl<F: ResourceFactory, P: SizingPolicy> ResourcePool<F, P> {
    /// Create a pool with an explicit sizing policy
    pub fn with_policy(
        factory: F,
        policy: P,
        low_watermark: u32,
        high_watermark: u32,
    ) -> Result<Self> {
        if low_watermark == 0 || low_watermark > high_watermark {
            return Err(NetforgeError::configuration(format!(
                "watermarks must satisfy 1 <= low <= high, got ({}, {})",
                low_watermark, high_watermark
            )));
        }
        Ok(Self {
            factory,
            policy,
            wm_low: low_watermark,
            wm_high: high_watermark,
            inner: Mutex::new(PoolInner {
                open: Vec::new(),
                allocated: 0,
            }),
        })
    }

    /// Get a resource from the pool
    ///
    /// Grows the pool if nothing is free and the high watermark allows it.
    /// Returns `Ok(None)` when the pool is exhausted; returns an error only
    /// if the factory fails to create a resource, in which case the pool is
    /// left unchanged.
    pub fn fetch(&self) -> Result<Option<F::Resource>> {
        let mut inner = self.inner.lock().unwrap();

        if inner.open.is_empty() {
            if inner.allocated >= self.wm_high {
                return Ok(None);
            }

            let want = if inner.allocated == 0 {
                self.wm_low
            } else {
                self.policy
                    .grow(inner.allocated)
                    .min(self.wm_high - inner.allocated)
                    .max(1)
            };

            // Create the whole batch before touching pool state so a factory
            // failure leaves no partial growth behind.
            let mut fresh = Vec::with_capacity(want as usize);
            for _ in 0..want {
                let mut resource = self.factory.create()?;
                self.factory.recycle(&mut resource);
                fresh.push(resource);
            }
            inner.allocated += want;
            inner.open.append(&mut fresh);
            log::debug!(
                "resource pool grew by {} to {} (high watermark {})",
                want,
                inner.allocated,
                self.wm_high
            );
        }

        Ok(inner.open.pop())
    }

    /// Return a resource to the pool
    ///
    /// The resource must have been fetched from this pool. After recycling it
    /// back into the free list, the sizing policy may decide to drop some
    /// free resources, never going below the low watermark.
    pub fn release(&self, mut resource: F::Resource) {
        self.factory.recycle(&mut resource);

        let mut inner = self.inner.lock().unwrap();
        inner.open.push(resource);

        if inner.allocated > self.wm_low {
            let mut remove = self
                .policy
                .shrink(inner.allocated, inner.open.len() as u32);
            if remove == 0 {
                return;
            }
            if inner.allocated - remove < self.wm_low {
                remove = inner.allocated - self.wm_low;
            }
            // Only free resources can be dropped.
            let remove = remove.min(inner.open.len() as u32);
            let keep = inner.open.len() - remove as usize;
            inner.open.truncate(keep);
            inner.allocated -= remove;
            log::debug!(
                "resource pool shrank by {} to {} (low watermark {})",
                remove,
                inner.allocated,
                self.wm_low
            );
        }
    }

    /// Total number of live resources, free or checked out
    pub fn allocated(&self) -> u32 {
        self.inner.lock().unwrap().allocated
    }

    /// Number of resources currently available for checkout
    pub fn free(&self) -> u32 {
        self.inner.lock().unwrap().open.len() as u32
    }

    /// Number of resources currently checked out
    pub fn used(&self) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.allocated - inner.open.len() as u32
    }

    /// The configured low watermark
    pub fn low_watermark(&self) -> u32 {
        self.wm_low
    }

    /// The configured high watermark
    pub fn high_watermark(&self) -> u32 {
        self.wm_high
    }
}
