//! Generic resource pooling
//!
//! A thread-safe pool of reusable resources bounded by low/high watermarks,
//! with pluggable sizing policies deciding when to allocate more resources
//! and when to let unused ones go. The thread pool draws its worker threads
//! from one of these.

mod policy;
mod resource_pool;

pub use policy::{BasicPolicy, FixedGrowthPolicy, FixedSizePolicy, NeverShrinkPolicy, SizingPolicy};
pub use resource_pool::{ResourceFactory, ResourcePool};
