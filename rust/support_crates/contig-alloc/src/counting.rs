//! An instrumentation wrapper that counts allocator events.
//!
//! Useful as a test double and for verifying growth behavior: a container
//! built over a [`CountingAllocator`] exposes exactly how many buffer
//! events a workload produced.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AllocError, Allocator, Global};

/// Snapshot of the event counters of a [`CountingAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    /// Number of fresh allocations.
    pub allocations: usize,
    /// Number of reallocations.
    pub reallocations: usize,
    /// Number of releases.
    pub releases: usize,
}

impl AllocStats {
    /// Total number of events that produced or resized a buffer.
    pub fn growth_events(&self) -> usize {
        self.allocations + self.reallocations
    }
}

#[derive(Debug, Default)]
struct Counters {
    allocations: AtomicUsize,
    reallocations: AtomicUsize,
    releases: AtomicUsize,
}

/// An allocator that delegates to an inner allocator and counts every
/// allocate/reallocate/release event.
///
/// Clones share the same counters, so a clone may be handed to a container
/// while the original is kept around for inspection.
#[derive(Debug, Clone, Default)]
pub struct CountingAllocator<A: Allocator = Global> {
    inner: A,
    counters: Arc<Counters>,
}

impl CountingAllocator<Global> {
    /// Creates a counting wrapper over the process-wide default allocator.
    pub fn new() -> CountingAllocator<Global> {
        CountingAllocator::over(Global)
    }
}

impl<A: Allocator> CountingAllocator<A> {
    /// Creates a counting wrapper over the given allocator.
    pub fn over(inner: A) -> CountingAllocator<A> {
        CountingAllocator {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns a snapshot of the event counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            allocations: self.counters.allocations.load(Ordering::Relaxed),
            reallocations: self.counters.reallocations.load(Ordering::Relaxed),
            releases: self.counters.releases.load(Ordering::Relaxed),
        }
    }
}

unsafe impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.inner.allocate(layout)?;
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        // SAFETY: forwarded as-is, upheld by the caller.
        let ptr = unsafe { self.inner.reallocate(ptr, old_layout, new_size)? };
        self.counters.reallocations.fetch_add(1, Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded as-is, upheld by the caller.
        unsafe { self.inner.release(ptr, layout) };
        self.counters.releases.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_allocator_events() {
        let alloc = CountingAllocator::new();
        let layout = Layout::array::<u64>(8).unwrap();

        let ptr = alloc.allocate(layout).unwrap();
        assert_eq!(
            alloc.stats(),
            AllocStats {
                allocations: 1,
                reallocations: 0,
                releases: 0
            }
        );

        let new_size = Layout::array::<u64>(32).unwrap().size();
        let ptr = unsafe { alloc.reallocate(ptr, layout, new_size).unwrap() };
        assert_eq!(alloc.stats().reallocations, 1);

        unsafe { alloc.release(ptr, Layout::array::<u64>(32).unwrap()) };
        let stats = alloc.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.growth_events(), 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let alloc = CountingAllocator::new();
        let clone = alloc.clone();

        let layout = Layout::array::<u8>(16).unwrap();
        let ptr = clone.allocate(layout).unwrap();
        unsafe { clone.release(ptr, layout) };

        assert_eq!(alloc.stats().allocations, 1);
        assert_eq!(alloc.stats().releases, 1);
    }
}
