//! # Netforge: Systems-Infrastructure Primitives for Network Services
//!
//! This crate collects the reusable building blocks of high-throughput
//! network services: resource and thread pooling, compressed-trie prefix
//! matching, Bloom-filter variants, and the small containers that keep
//! showing up around them.
//!
//! ## Key Features
//!
//! - **Resource Pooling**: Watermarked, thread-safe pools with pluggable
//!   sizing policies
//! - **Thread Pool**: Prioritized blocking jobs on pooled worker threads,
//!   with callbacks serialized onto one controlling thread
//! - **LC-Trie**: Level-compressed trie for IPv4/IPv6 CIDR membership,
//!   lock-free for concurrent readers, with gzip persistence
//! - **Synchronizer**: Two-barrier rendezvous for swapping shared state
//!   under live reader threads
//! - **Bloom Filters**: Plain, counting, and timeout variants over a
//!   generic filter core with a seedable murmur3 hash
//! - **Working-Set Estimation**: Sliding-window distinct-byte-volume
//!   estimates built on chained Bloom filters
//! - **Containers**: Weighted LRU cache, ring buffer, lossy hash table
//!
//! ## Quick Start
//!
//! ```rust
//! use netforge::{LcTrie, PrefixEntry, Ipv4Key, PrefixKey, BloomFilter, LruCache};
//!
//! // Compile a prefix set and test membership.
//! let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
//! trie.build(vec![
//!     PrefixEntry::parse("10.0.0.0/8").unwrap(),
//!     PrefixEntry::parse("10.1.0.0/16").unwrap(),
//! ]).unwrap();
//! assert!(trie.search(Ipv4Key::parse_addr("10.1.2.3").unwrap()));
//! assert!(!trie.search(Ipv4Key::parse_addr("11.0.0.0").unwrap()));
//!
//! // Approximate set membership.
//! let mut filter = BloomFilter::new(10_000, 0.01).unwrap();
//! filter.add(b"observed");
//! assert!(filter.query(b"observed"));
//!
//! // Bounded caching.
//! let mut cache = LruCache::new(1024);
//! cache.insert("session", 42u32);
//! assert_eq!(cache.lookup(&"session"), Some(&mut 42));
//! ```
//!
//! ## Threading Model
//!
//! The [`ThreadPool`] runs job `run` phases on dedicated worker threads and
//! every `callback` on the single thread driving the pool, so callback code
//! shares state without locks. The [`LcTrie`] is immutable after `build`
//! and read concurrently without synchronization; rebuild-and-swap under a
//! [`Synchronizer`] replaces it safely while readers run.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod container;
pub mod error;
pub mod filter;
pub mod hash;
pub mod io;
pub mod pool;
pub mod sync;
pub mod thread_pool;
pub mod trie;
pub mod wss;

// Re-export core types
pub use error::{NetforgeError, Result};

pub use container::{LossyHashTable, LruCache, RingBuffer};
pub use filter::{
    BitStore, BloomFilter, Counter, CountingBloomFilter, CountingStore, FilterStore,
    GenericBloomFilter, TimeoutBloomFilter,
};
pub use hash::murmur3_32;
pub use io::{DataInput, DataOutput, ReaderDataInput, SliceDataInput, VecDataOutput, WriterDataOutput};
pub use pool::{
    BasicPolicy, FixedGrowthPolicy, FixedSizePolicy, NeverShrinkPolicy, ResourceFactory,
    ResourcePool, SizingPolicy,
};
pub use sync::Synchronizer;
pub use thread_pool::{Job, ThreadPool};
pub use trie::{Ipv4Key, Ipv6Key, LcTrie, PrefixEntry, PrefixKey, TrieStats};
pub use wss::WssEstimator;
