//! Reader/writer rendezvous for hot-swapping shared state
//!
//! A [`Synchronizer`] lets one writer thread pause a fixed set of reader
//! threads at a safe point, mutate data they share without per-access
//! locking, and release them all at once. Readers call
//! [`wait_for_updates`](Synchronizer::wait_for_updates) at the top of their
//! processing loop; when no swap is pending this is a single atomic load.
//!
//! The canonical use is replacing a freshly built [`LcTrie`](crate::trie::LcTrie):
//! the trie is immutable and read without locks, so the only coordination
//! needed is making sure no reader is mid-search while the pointer changes.
//!
//! The participant count freezes at the first `acquire_sync`; registering
//! afterwards is a configuration error.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;

use once_cell::sync::OnceCell;

use crate::error::{NetforgeError, Result};

struct SyncBarriers {
    start: Barrier,
    end: Barrier,
}

/// Two-phase barrier synchronizer: one writer, `participants` readers
pub struct Synchronizer {
    participants: AtomicUsize,
    do_wait: AtomicBool,
    barriers: OnceCell<SyncBarriers>,
}

impl Synchronizer {
    /// Create a synchronizer for a known number of reader threads
    ///
    /// Pass 0 and have each reader call [`register`](Self::register) before
    /// the writer's first [`acquire_sync`](Self::acquire_sync) if the count
    /// is not known up front.
    pub fn new(participants: usize) -> Self {
        Self {
            participants: AtomicUsize::new(participants),
            do_wait: AtomicBool::new(false),
            barriers: OnceCell::new(),
        }
    }

    /// Add one reader to the rendezvous
    ///
    /// Fails once the first synchronization has fixed the participant count.
    /// Call this for every reader before starting it, not from inside the
    /// reader, if the reader might race the writer's first `acquire_sync`.
    pub fn register(&self) -> Result<()> {
        if self.barriers.get().is_some() {
            return Err(NetforgeError::configuration(
                "cannot add readers to an already-active synchronizer",
            ));
        }
        self.participants.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Number of reader threads participating
    pub fn participants(&self) -> usize {
        self.participants.load(Ordering::SeqCst)
    }

    /// Writer: signal readers to pause and wait until all have done so
    ///
    /// Blocks until every reader reaches `wait_for_updates`; readers in the
    /// middle of long processing delay this accordingly. When this returns,
    /// the writer has exclusive access to the shared data until
    /// [`release_sync`](Self::release_sync).
    pub fn acquire_sync(&self) {
        let barriers = self.barriers.get_or_init(|| {
            let count = self.participants.load(Ordering::SeqCst) + 1;
            SyncBarriers {
                start: Barrier::new(count),
                end: Barrier::new(count),
            }
        });

        // Readers must observe initialized barriers whenever they observe
        // the flag; the release store after get_or_init guarantees it.
        self.do_wait.store(true, Ordering::SeqCst);
        barriers.start.wait();
    }

    /// Writer: let the paused readers continue
    pub fn release_sync(&self) {
        self.do_wait.store(false, Ordering::SeqCst);
        if let Some(barriers) = self.barriers.get() {
            barriers.end.wait();
        }
    }

    /// Reader: pause here if a writer is waiting to swap shared data
    ///
    /// When no swap is pending this returns immediately. Otherwise the
    /// reader blocks through both barriers and resumes only after the
    /// writer's `release_sync`.
    pub fn wait_for_updates(&self) {
        if !self.do_wait.load(Ordering::SeqCst) {
            return;
        }
        let Some(barriers) = self.barriers.get() else {
            return;
        };
        // Rendezvous with the writer, then hold until it finishes writing.
        barriers.start.wait();
        barriers.end.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_register_before_first_sync() {
        let sync = Synchronizer::new(0);
        sync.register().unwrap();
        sync.register().unwrap();
        assert_eq!(sync.participants(), 2);
    }

    #[test]
    fn test_register_after_first_sync_fails() {
        let sync = Arc::new(Synchronizer::new(1));

        let reader = {
            let sync = sync.clone();
            std::thread::spawn(move || {
                // Spin until the writer raises the flag, then rendezvous.
                while !sync.do_wait.load(Ordering::SeqCst) {
                    std::thread::yield_now();
                }
                sync.wait_for_updates();
            })
        };

        sync.acquire_sync();
        sync.release_sync();
        reader.join().unwrap();

        assert!(sync.register().is_err());
    }

    #[test]
    fn test_fast_path_without_writer() {
        let sync = Synchronizer::new(4);
        // No writer pending: returns immediately, no barrier involved.
        sync.wait_for_updates();
        sync.wait_for_updates();
    }

    #[test]
    fn test_writer_has_exclusive_access() {
        const READERS: usize = 4;
        const CYCLES: u64 = 25;

        let sync = Arc::new(Synchronizer::new(READERS));
        // The writer updates the pair non-atomically inside its critical
        // section; readers must never observe the halves out of step.
        let shared = Arc::new((AtomicU64::new(0), AtomicU64::new(0)));
        let stop = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        for _ in 0..READERS {
            let sync = sync.clone();
            let shared = shared.clone();
            let stop = stop.clone();
            readers.push(std::thread::spawn(move || {
                let mut observed_tears = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    sync.wait_for_updates();
                    let a = shared.0.load(Ordering::SeqCst);
                    let b = shared.1.load(Ordering::SeqCst);
                    if a != b {
                        observed_tears += 1;
                    }
                }
                observed_tears
            }));
        }

        for cycle in 1..=CYCLES {
            sync.acquire_sync();
            shared.0.store(cycle, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            shared.1.store(cycle, Ordering::SeqCst);
            sync.release_sync();
        }

        stop.store(true, Ordering::SeqCst);
        for reader in readers {
            assert_eq!(reader.join().unwrap(), 0);
        }
        assert_eq!(shared.0.load(Ordering::SeqCst), CYCLES);
    }

    #[test]
    fn test_repeated_cycles_reuse_barriers() {
        let sync = Arc::new(Synchronizer::new(1));
        let sync2 = sync.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let reader = std::thread::spawn(move || {
            while !stop2.load(Ordering::SeqCst) {
                sync2.wait_for_updates();
            }
        });

        for _ in 0..50 {
            sync.acquire_sync();
            sync.release_sync();
        }
        stop.store(true, Ordering::SeqCst);
        reader.join().unwrap();
    }
}
