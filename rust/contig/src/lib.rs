//! Growable contiguous storage primitive.
//!
//! [`Array<T, A>`] owns a single heap buffer, tracks logical length and
//! allocated capacity, and exposes indexed access, append, insert, bulk
//! extend and a generalized splice operation, all with order-preserving,
//! amortized O(1) growth. The allocator is an injected capability bound at
//! construction; the default type parameter selects the process-wide
//! allocator, so `Array<T>` is the common fixed-allocator form.
//!
//! Element types are plain old data (`bytemuck::NoUninit +
//! bytemuck::AnyBitPattern`): the container moves raw bytes and never runs
//! element-level teardown.

mod array;
mod raw;

pub use array::Array;
pub use contig_alloc::{AllocError, Allocator, Global, counting};
