//! Simple container primitives
//!
//! An LRU cache with weighted entry sizes, a fixed-capacity ring buffer,
//! and a lossy fixed-size hash table. None of these are thread safe; they
//! are building blocks for single-threaded fast paths.

mod lossy_table;
mod lru_cache;
mod ring_buffer;

pub use lossy_table::LossyHashTable;
pub use lru_cache::LruCache;
pub use ring_buffer::RingBuffer;
