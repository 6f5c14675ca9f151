//! Allocator capability for the `contig` containers.
//!
//! A container binds an [`Allocator`] at construction time and routes every
//! buffer operation through it for the rest of its lifetime. [`Global`] is
//! the process-wide default; [`counting::CountingAllocator`] wraps any
//! allocator with event counters for instrumentation and test doubles.

use std::alloc::Layout;
use std::ptr::NonNull;

use thiserror::Error;

pub mod counting;

/// Error returned when an allocator cannot satisfy a request.
///
/// The base container operations treat this condition as fatal; the
/// `try_reserve` family surfaces it to the caller instead.
#[derive(Debug, Clone, Error)]
#[error("memory allocation of {size} bytes failed")]
pub struct AllocError {
    /// Size of the request that failed, in bytes.
    pub size: usize,
}

/// A memory allocation capability: allocate, reallocate and release raw
/// blocks of memory.
///
/// This is the strategy-injection seam of the containers. Implementations
/// may delegate to the global allocator, an arena, or an instrumentation
/// wrapper; the container never assumes anything about the block beyond the
/// guarantees below.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - A block returned by `allocate` or `reallocate` is valid for reads and
///   writes of `layout.size()` (resp. `new_size`) bytes, aligned to
///   `layout.align()`, and remains valid until passed to `release` or
///   `reallocate` on the same allocator.
/// - `reallocate` preserves the first `min(old_layout.size(), new_size)`
///   bytes of the block.
/// - Blocks are exclusively owned by the caller; the allocator retains no
///   aliasing access to them.
pub unsafe trait Allocator {
    /// Allocates a fresh block of memory described by `layout`.
    ///
    /// `layout` must have a non-zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Grows or shrinks a previously allocated block to `new_size` bytes.
    ///
    /// The returned pointer may differ from `ptr`; on success the old
    /// pointer is invalidated.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` or `reallocate` on this
    /// allocator with layout `old_layout`, and must not have been released.
    /// `new_size` must be non-zero and must not overflow `isize` when
    /// rounded up to `old_layout.align()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError>;

    /// Releases a previously allocated block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` or `reallocate` on this
    /// allocator with layout `layout`, and must not be used afterwards.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

// Allocators can be shared by reference between containers.
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { (**self).reallocate(ptr, old_layout, new_size) }
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).release(ptr, layout) }
    }
}

/// The process-wide default allocator, backed by `std::alloc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert!(layout.size() != 0, "zero-sized allocation");
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError {
            size: layout.size(),
        })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        assert!(new_size != 0, "zero-sized reallocation");
        // SAFETY: upheld by the caller per the trait contract.
        let ptr = unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) };
        NonNull::new(ptr).ok_or(AllocError { size: new_size })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: upheld by the caller per the trait contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_allocate_release() {
        let layout = Layout::array::<u64>(16).unwrap();
        let ptr = Global.allocate(layout).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0xAB, layout.size());
            assert_eq!(*ptr.as_ptr(), 0xAB);
            Global.release(ptr, layout);
        }
    }

    #[test]
    fn test_global_reallocate_preserves_prefix() {
        let old_layout = Layout::array::<u32>(4).unwrap();
        let ptr = Global.allocate(old_layout).unwrap();
        unsafe {
            let values = ptr.as_ptr() as *mut u32;
            for i in 0..4 {
                values.add(i).write(i as u32 + 1);
            }
            let new_size = Layout::array::<u32>(64).unwrap().size();
            let ptr = Global.reallocate(ptr, old_layout, new_size).unwrap();
            let values = ptr.as_ptr() as *const u32;
            for i in 0..4 {
                assert_eq!(*values.add(i), i as u32 + 1);
            }
            Global.release(ptr, Layout::array::<u32>(64).unwrap());
        }
    }

    #[test]
    fn test_allocator_by_reference() {
        let alloc = Global;
        let layout = Layout::array::<u8>(32).unwrap();
        let ptr = (&alloc).allocate(layout).unwrap();
        unsafe { (&alloc).release(ptr, layout) };
    }

    #[test]
    fn test_alloc_error_display() {
        let err = AllocError { size: 4096 };
        assert_eq!(err.to_string(), "memory allocation of 4096 bytes failed");
    }
}
