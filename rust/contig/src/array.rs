//! A growable, order-preserving contiguous array.

use std::fmt;
use std::ptr;

use bytemuck::{AnyBitPattern, NoUninit};
use contig_alloc::{AllocError, Allocator, Global};

use crate::raw::RawBuf;

/// Minimum capacity produced by the first growth step.
const MIN_GROWTH_CAP: usize = 8;

/// A growable contiguous array of plain-old-data elements.
///
/// The container owns a single heap buffer and tracks the number of
/// initialized elements (`len`) separately from the number of allocated
/// slots (`capacity`). Append is amortized O(1): every growth step at least
/// doubles the capacity. Insertion, removal and replacement of runs all go
/// through one generalized splice primitive that preserves element order.
///
/// The allocator is bound at construction and used for every buffer
/// operation on the instance. `Array<T>` uses the process-wide [`Global`]
/// allocator; `Array<T, A>` injects one (an arena, a counting wrapper, a
/// test double).
///
/// Element types must be `bytemuck::NoUninit + bytemuck::AnyBitPattern`:
/// the container moves raw bytes and never runs element-level teardown,
/// and zero-filled slots (see [`grow_by`](Array::grow_by)) must be valid
/// values.
///
/// Any mutating call may relocate the buffer, so references returned by
/// the accessors must not be held across mutation; the borrow checker
/// enforces this.
pub struct Array<T, A: Allocator = Global> {
    buf: RawBuf<T, A>,
    len: usize,
}

impl<T: NoUninit + AnyBitPattern> Array<T> {
    /// Creates an empty array over the process-wide allocator.
    ///
    /// No allocation takes place until the first element is added.
    pub fn new() -> Array<T> {
        Array::new_in(Global)
    }

    /// Creates an empty array with at least `capacity` pre-allocated slots.
    pub fn with_capacity(capacity: usize) -> Array<T> {
        Array::with_capacity_in(capacity, Global)
    }
}

impl<T: NoUninit + AnyBitPattern, A: Allocator> Array<T, A> {
    /// Creates an empty array bound to the given allocator.
    pub fn new_in(alloc: A) -> Array<T, A> {
        Array {
            buf: RawBuf::new_in(alloc),
            len: 0,
        }
    }

    /// Creates an empty array bound to the given allocator, with at least
    /// `capacity` pre-allocated slots.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Array<T, A> {
        let mut array = Array::new_in(alloc);
        array.buf.reserve_exact(capacity);
        array
    }

    /// Number of initialized elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.cap()
    }

    /// The allocator this array was constructed with.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Returns a reference to the element at `index`, or `None` if out of
    /// bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            // SAFETY: index is within the initialized prefix.
            Some(unsafe { &*self.buf.as_ptr().add(index) })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the element at `index`, or `None` if
    /// out of bounds.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            // SAFETY: index is within the initialized prefix.
            Some(unsafe { &mut *self.buf.as_ptr().add(index) })
        } else {
            None
        }
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn at(&self, index: usize) -> &T {
        assert!(
            index < self.len,
            "index out of bounds: the len is {} but the index is {}",
            self.len,
            index
        );
        // SAFETY: just checked.
        unsafe { &*self.buf.as_ptr().add(index) }
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.len,
            "index out of bounds: the len is {} but the index is {}",
            self.len,
            index
        );
        // SAFETY: just checked.
        unsafe { &mut *self.buf.as_ptr().add(index) }
    }

    /// Returns a reference to the element at `index` without a bounds
    /// check.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        // SAFETY: upheld by the caller.
        unsafe { &*self.buf.as_ptr().add(index) }
    }

    /// Returns a mutable reference to the element at `index` without a
    /// bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        // SAFETY: upheld by the caller.
        unsafe { &mut *self.buf.as_ptr().add(index) }
    }

    /// Returns a reference to the first element, or `None` if empty.
    #[inline]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns a reference to the last element, or `None` if empty.
    #[inline]
    pub fn last(&self) -> Option<&T> {
        if self.len == 0 { None } else { self.get(self.len - 1) }
    }

    /// Appends an element at the tail.
    pub fn push(&mut self, value: T) {
        self.grow(1);
        // SAFETY: grow guarantees len < capacity.
        unsafe { self.buf.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Inserts an element at `index`, shifting the elements at
    /// `[index, len)` one slot to the right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) {
        self.splice_raw(index, 0, 1, Some(&value as *const T));
    }

    /// Removes and returns the element at `index`, shifting the elements at
    /// `[index + 1, len)` one slot to the left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "remove index {} out of bounds (len {})",
            index,
            self.len
        );
        // SAFETY: just checked; T is plain data, so this copy does not
        // duplicate any ownership.
        let value = unsafe { self.buf.as_ptr().add(index).read() };
        self.splice_raw(index, 1, 0, None);
        value
    }

    /// Replaces the `old_count` elements starting at `index` with the
    /// contents of `replacement`, shifting the tail to keep the remaining
    /// elements contiguous and in order.
    ///
    /// `old_count = 0` is a pure insertion; an empty `replacement` is a
    /// pure removal.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or `index + old_count > len()`.
    pub fn splice(&mut self, index: usize, old_count: usize, replacement: &[T]) {
        self.splice_raw(index, old_count, replacement.len(), Some(replacement.as_ptr()));
    }

    /// Appends `count` zero-initialized elements at the tail.
    ///
    /// Zeroed bytes are a valid `T` per the `AnyBitPattern` bound.
    pub fn grow_by(&mut self, count: usize) {
        self.splice_raw(self.len, 0, count, None);
    }

    /// Appends the contents of `values` at the tail.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.splice_raw(self.len, 0, values.len(), Some(values.as_ptr()));
    }

    /// Shortens the array to `new_len` elements. Has no effect if `new_len`
    /// is not below the current length. Capacity is retained.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len {
            self.len = new_len;
        }
    }

    /// Removes all elements. Capacity is retained, making this a cheap
    /// reset for reuse.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Releases the buffer and returns the array to the empty state:
    /// `len() == 0`, `capacity() == 0`, no allocation. The array remains
    /// fully usable afterwards.
    pub fn reset(&mut self) {
        self.buf.release();
        self.len = 0;
    }

    /// Reserves capacity for at least `additional` more elements, applying
    /// the amortized growth policy. Aborts on exhaustion.
    pub fn reserve(&mut self, additional: usize) {
        self.grow(additional);
    }

    /// Fallible form of [`reserve`](Array::reserve): surfaces allocation
    /// failure instead of aborting, leaving the array unchanged on error.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self.len.checked_add(additional).expect("capacity overflow");
        if needed <= self.buf.cap() {
            return Ok(());
        }
        self.buf.try_reserve_exact(self.growth_target(needed))
    }

    /// Ensures capacity for `margin` additional elements.
    fn grow(&mut self, margin: usize) {
        let needed = self.len.checked_add(margin).expect("capacity overflow");
        if needed <= self.buf.cap() {
            return;
        }
        self.buf.reserve_exact(self.growth_target(needed));
    }

    /// Growth policy: at least double the capacity, never below
    /// `MIN_GROWTH_CAP`, and always enough for `needed`.
    fn growth_target(&self, needed: usize) -> usize {
        self.buf
            .cap()
            .saturating_mul(2)
            .max(MIN_GROWTH_CAP)
            .max(needed)
    }

    /// The generalized splice primitive: removes `old_count` elements at
    /// `index`, makes room for `new_count` elements there, shifts the tail
    /// with an overlap-tolerant move, and fills the gap from `src` or with
    /// zeroes when `src` is `None`.
    ///
    /// `src`, when present, points at `new_count` valid elements disjoint
    /// from the buffer (guaranteed by taking `&mut self` alongside a shared
    /// borrow of the source in the public callers).
    fn splice_raw(&mut self, index: usize, old_count: usize, new_count: usize, src: Option<*const T>) {
        assert!(
            index <= self.len,
            "splice index {} out of bounds (len {})",
            index,
            self.len
        );
        let old_end = index.checked_add(old_count).expect("capacity overflow");
        assert!(
            old_end <= self.len,
            "splice range end {} out of bounds (len {})",
            old_end,
            self.len
        );
        let new_len = (self.len - old_count)
            .checked_add(new_count)
            .expect("capacity overflow");
        if new_len > self.len {
            self.grow(new_len - self.len);
        }

        let base = self.buf.as_ptr();
        let new_end = index + new_count;
        unsafe {
            if self.len > old_end {
                // The ranges may overlap; ptr::copy is a memmove.
                ptr::copy(base.add(old_end), base.add(new_end), self.len - old_end);
            }
            if new_count > 0 {
                match src {
                    Some(src) => ptr::copy_nonoverlapping(src, base.add(index), new_count),
                    // SAFETY of the zero-fill: T: AnyBitPattern implies
                    // Zeroable, so all-zero bytes are a valid T.
                    None => base.add(index).write_bytes(0, new_count),
                }
            }
        }
        self.len = new_len;
    }

    fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized; for len == 0 the
        // dangling pointer is non-null and aligned.
        unsafe { std::slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }
}

impl<T: NoUninit + AnyBitPattern, A: Allocator + Default> Default for Array<T, A> {
    fn default() -> Array<T, A> {
        Array::new_in(A::default())
    }
}

impl<T: NoUninit + AnyBitPattern, A: Allocator + Clone> Clone for Array<T, A> {
    fn clone(&self) -> Array<T, A> {
        let mut clone = Array::with_capacity_in(self.len, self.allocator().clone());
        clone.extend_from_slice(self.as_slice());
        clone
    }
}

impl<T: NoUninit + AnyBitPattern + fmt::Debug, A: Allocator> fmt::Debug for Array<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: NoUninit + AnyBitPattern + PartialEq, A: Allocator> PartialEq for Array<T, A> {
    fn eq(&self, other: &Array<T, A>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: NoUninit + AnyBitPattern + Eq, A: Allocator> Eq for Array<T, A> {}

impl<T: NoUninit + AnyBitPattern, A: Allocator> std::ops::Index<usize> for Array<T, A> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        self.at(index)
    }
}

impl<T: NoUninit + AnyBitPattern, A: Allocator> std::ops::IndexMut<usize> for Array<T, A> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index)
    }
}
