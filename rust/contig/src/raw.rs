//! The owned, reallocatable buffer handle underlying [`Array`](crate::Array).

use std::alloc::{Layout, handle_alloc_error};
use std::mem::size_of;
use std::ptr::NonNull;

use contig_alloc::{AllocError, Allocator};

/// An exclusively owned buffer of `cap` slots of `T`, managed through an
/// injected [`Allocator`].
///
/// `RawBuf` knows nothing about which slots are initialized; that is the
/// caller's bookkeeping. Any reservation may relocate the buffer, so raw
/// pointers into it must not be cached across calls.
pub(crate) struct RawBuf<T, A: Allocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
}

// The buffer is exclusively owned and `T` is plain data, so transfer and
// sharing across threads is governed by `T` and `A` alone.
unsafe impl<T: Send, A: Allocator + Send> Send for RawBuf<T, A> {}
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawBuf<T, A> {}

impl<T, A: Allocator> RawBuf<T, A> {
    /// Creates an empty buffer bound to `alloc`. No allocation takes place
    /// until the first reservation.
    pub(crate) fn new_in(alloc: A) -> RawBuf<T, A> {
        assert!(size_of::<T>() != 0, "zero-sized element types are not supported");
        RawBuf {
            ptr: NonNull::dangling(),
            cap: 0,
            alloc,
        }
    }

    /// Number of allocated slots.
    #[inline]
    pub(crate) fn cap(&self) -> usize {
        self.cap
    }

    /// Pointer to the first slot. Dangling (but well-aligned) when
    /// `cap() == 0`; invalidated by any reservation or release.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// The allocator this buffer was constructed with.
    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Reallocates to exactly `new_cap` slots. Grow-only: a request at or
    /// below the current capacity is a no-op. Aborts on exhaustion.
    pub(crate) fn reserve_exact(&mut self, new_cap: usize) {
        if self.try_reserve_exact(new_cap).is_err() {
            handle_alloc_error(layout_for::<T>(new_cap));
        }
    }

    /// Fallible form of [`reserve_exact`](Self::reserve_exact), surfacing
    /// exhaustion instead of aborting.
    pub(crate) fn try_reserve_exact(&mut self, new_cap: usize) -> Result<(), AllocError> {
        if new_cap <= self.cap {
            return Ok(());
        }
        let new_layout = layout_for::<T>(new_cap);
        let ptr = if self.cap == 0 {
            self.alloc.allocate(new_layout)?
        } else {
            // SAFETY: the block was obtained from `self.alloc` with the
            // layout of the current capacity and has not been released.
            unsafe {
                self.alloc
                    .reallocate(self.ptr.cast(), layout_for::<T>(self.cap), new_layout.size())?
            }
        };
        self.ptr = ptr.cast();
        self.cap = new_cap;
        Ok(())
    }

    /// Releases the buffer and returns to the empty state. The handle
    /// remains usable; the next reservation allocates afresh.
    pub(crate) fn release(&mut self) {
        if self.cap != 0 {
            // SAFETY: the block was obtained from `self.alloc` with this
            // exact layout and is not used past this point.
            unsafe {
                self.alloc.release(self.ptr.cast(), layout_for::<T>(self.cap));
            }
            self.ptr = NonNull::dangling();
            self.cap = 0;
        }
    }
}

impl<T, A: Allocator> Drop for RawBuf<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

#[inline]
fn layout_for<T>(cap: usize) -> Layout {
    Layout::array::<T>(cap).expect("capacity overflow")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contig_alloc::Global;
    use contig_alloc::counting::CountingAllocator;

    #[test]
    fn test_new_is_empty() {
        let buf = RawBuf::<u32, _>::new_in(Global);
        assert_eq!(buf.cap(), 0);
    }

    #[test]
    fn test_reserve_exact_is_grow_only() {
        let mut buf = RawBuf::<u32, _>::new_in(Global);
        buf.reserve_exact(16);
        assert_eq!(buf.cap(), 16);
        let ptr = buf.as_ptr();

        buf.reserve_exact(8);
        assert_eq!(buf.cap(), 16);
        assert_eq!(buf.as_ptr(), ptr);

        buf.reserve_exact(16);
        assert_eq!(buf.cap(), 16);
        assert_eq!(buf.as_ptr(), ptr);
    }

    #[test]
    fn test_reserve_preserves_contents() {
        let mut buf = RawBuf::<u64, _>::new_in(Global);
        buf.reserve_exact(4);
        unsafe {
            for i in 0..4 {
                buf.as_ptr().add(i).write(i as u64 * 10);
            }
        }
        buf.reserve_exact(128);
        assert_eq!(buf.cap(), 128);
        unsafe {
            for i in 0..4 {
                assert_eq!(*buf.as_ptr().add(i), i as u64 * 10);
            }
        }
    }

    #[test]
    fn test_release_is_reusable() {
        let alloc = CountingAllocator::new();
        let mut buf = RawBuf::<u8, _>::new_in(alloc.clone());
        buf.reserve_exact(32);
        buf.release();
        assert_eq!(buf.cap(), 0);
        assert_eq!(alloc.stats().releases, 1);

        buf.reserve_exact(8);
        assert_eq!(buf.cap(), 8);
        drop(buf);
        assert_eq!(alloc.stats().allocations, 2);
        assert_eq!(alloc.stats().releases, 2);
    }

    #[test]
    fn test_try_reserve_exact() {
        let mut buf = RawBuf::<u32, _>::new_in(Global);
        assert!(buf.try_reserve_exact(8).is_ok());
        assert_eq!(buf.cap(), 8);
    }

    #[test]
    #[should_panic(expected = "zero-sized element types")]
    fn test_zero_sized_elements_rejected() {
        let _ = RawBuf::<(), _>::new_in(Global);
    }
}
