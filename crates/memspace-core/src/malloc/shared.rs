//! Lock-wrapped allocator for multi-threaded hosts.
//!
//! `malloc` and `free` each touch both region lists, so the whole allocator
//! sits behind one `parking_lot::Mutex`. Every call runs to completion while
//! holding it.

use parking_lot::Mutex;

use super::allocator::{Allocator, AllocatorLogRecord};
use super::snapshot::SpaceSnapshot;
use crate::config::AllocatorConfig;
use crate::error::AllocatorError;

/// Thread-safe handle to one [`Allocator`].
pub struct SharedAllocator {
    inner: Mutex<Allocator>,
}

impl SharedAllocator {
    pub fn new(max_size: usize) -> Result<Self, AllocatorError> {
        Allocator::new(max_size).map(Self::from)
    }

    pub fn with_config(config: AllocatorConfig) -> Result<Self, AllocatorError> {
        Allocator::with_config(config).map(Self::from)
    }

    pub fn malloc(&self, length: usize) -> Result<Option<usize>, AllocatorError> {
        self.inner.lock().malloc(length)
    }

    pub fn free(&self, address: usize) -> Result<(), AllocatorError> {
        self.inner.lock().free(address)
    }

    pub fn defrag(&self) -> usize {
        self.inner.lock().defrag()
    }

    pub fn snapshot(&self) -> SpaceSnapshot {
        self.inner.lock().snapshot()
    }

    /// Takes the retained lifecycle records, oldest first.
    ///
    /// The allocator keeps at most
    /// [`LIFECYCLE_LOG_CAPACITY`](super::allocator::LIFECYCLE_LOG_CAPACITY)
    /// records; long-running hosts drain periodically to avoid losing any.
    pub fn drain_lifecycle_logs(&self) -> Vec<AllocatorLogRecord> {
        self.inner.lock().drain_lifecycle_logs()
    }

    /// Runs `f` with exclusive access to the allocator.
    pub fn with<R>(&self, f: impl FnOnce(&mut Allocator) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> Allocator {
        self.inner.into_inner()
    }
}

impl From<Allocator> for SharedAllocator {
    fn from(allocator: Allocator) -> Self {
        Self {
            inner: Mutex::new(allocator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::malloc::allocator::LIFECYCLE_LOG_CAPACITY;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_shared_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedAllocator>();
    }

    #[test]
    fn test_concurrent_malloc_free_keeps_partition() {
        let shared = Arc::new(SharedAllocator::new(1 << 16).unwrap());
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for round in 0..200 {
                        let length = 1 + (worker * 7 + round) % 32;
                        if let Some(address) = shared.malloc(length).unwrap() {
                            shared.free(address).unwrap();
                        }
                        if round % 50 == 0 {
                            shared.defrag();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        shared.defrag();
        let snapshot = shared.snapshot();
        assert!(snapshot.allocated.is_empty());
        assert_eq!(snapshot.free.len(), 1);
        assert_eq!(snapshot.free_total(), 1 << 16);
        assert!(shared.with(|space| space.check_partition()).is_ok());
    }

    #[test]
    fn test_long_running_host_retains_bounded_logs() {
        let shared = SharedAllocator::new(1024).unwrap();
        for _ in 0..50_000 {
            let address = shared.malloc(8).unwrap().unwrap();
            shared.free(address).unwrap();
        }
        assert_eq!(
            shared.with(|space| space.lifecycle_logs().len()),
            LIFECYCLE_LOG_CAPACITY
        );

        let drained = shared.drain_lifecycle_logs();
        assert_eq!(drained.len(), LIFECYCLE_LOG_CAPACITY);
        assert!(shared.with(|space| space.lifecycle_logs().is_empty()));
        shared.malloc(8).unwrap();
        assert_eq!(shared.drain_lifecycle_logs().len(), 2);
    }

    #[test]
    fn test_into_inner_returns_state() {
        let shared = SharedAllocator::new(10).unwrap();
        shared.malloc(4).unwrap();
        let space = shared.into_inner();
        assert_eq!(space.allocated_total(), 4);
    }
}
