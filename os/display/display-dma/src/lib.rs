//! # Device-Visible Memory
//!
//! Translation tables and command lists are read by the display engine
//! directly from memory, so they live in **device-visible** buffers. This
//! crate defines the seam through which the planner obtains such buffers and
//! the ownership rules around them.
//!
//! ## Ownership
//!
//! A buffer is returned by value from [`DmaAllocator::alloc`] and is released
//! when it is dropped. There is no explicit free and no reference count:
//!
//! ```text
//!   PlaneState ──owns──► Option<Buffer> ──drop──► allocator reclaims blocks
//! ```
//!
//! The plane state holding the buffer (through a [`DmaSlot`]) is its only
//! owner, so every exit path releases it exactly once: plane teardown,
//! reallocation to a larger size, or an early return on error.
//!
//! ## Host pool ([`PoolDmaAllocator`])
//!
//! A fixed range of device addresses carved into equally sized blocks and
//! tracked with a bitmap, the same scheme a bitmap frame allocator uses for
//! physical frames. Buffers are backed by zeroed host memory, which makes the
//! whole planner runnable off-target.

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

#[cfg(feature = "host")]
mod pool;

#[cfg(feature = "host")]
pub use pool::{PoolBuffer, PoolDmaAllocator};

use display_addresses::DeviceAddress;

/// A device-visible buffer with a CPU view of its contents.
pub trait DmaMemory {
    /// Address the display engine uses to reach the first byte.
    fn device_address(&self) -> DeviceAddress;

    /// CPU view of the buffer.
    fn as_bytes(&self) -> &[u8];

    /// Mutable CPU view of the buffer.
    fn as_bytes_mut(&mut self) -> &mut [u8];

    /// Size in bytes.
    #[inline]
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `values` as little-endian words starting at byte `offset`.
    ///
    /// # Panics
    /// If the words do not fit in the buffer.
    fn write_words(&mut self, offset: usize, values: &[u32]) {
        let bytes = &mut self.as_bytes_mut()[offset..offset + values.len() * 4];
        for (chunk, v) in bytes.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
    }
}

/// Source of device-visible buffers.
///
/// Returned buffers are zeroed and aligned to at least `align` bytes in
/// device address space. `None` means the device memory is exhausted.
pub trait DmaAllocator {
    type Buffer: DmaMemory;

    fn alloc(&mut self, len: usize, align: u64) -> Option<Self::Buffer>;
}

/// A lazily allocated buffer that is reused while large enough.
///
/// The slot is the buffer's single owner. Growing drops the old buffer
/// before allocating the new one, and dropping the slot releases whatever
/// it holds.
#[derive(Debug)]
pub struct DmaSlot<B> {
    buf: Option<B>,
}

impl<B> Default for DmaSlot<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B> DmaSlot<B> {
    #[must_use]
    pub const fn empty() -> Self {
        Self { buf: None }
    }

    #[inline]
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.buf.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn get(&self) -> Option<&B> {
        self.buf.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn get_mut(&mut self) -> Option<&mut B> {
        self.buf.as_mut()
    }

    /// Drop the buffer now.
    pub fn release(&mut self) {
        self.buf = None;
    }
}

impl<B: DmaMemory> DmaSlot<B> {
    /// A buffer of at least `len` bytes aligned to `align`, reusing the
    /// current one when it qualifies. `None` if the allocator is exhausted,
    /// in which case the slot is left empty.
    pub fn ensure<A>(&mut self, dma: &mut A, len: usize, align: u64) -> Option<&mut B>
    where
        A: DmaAllocator<Buffer = B> + ?Sized,
    {
        let fits = self
            .buf
            .as_ref()
            .is_some_and(|b| b.len() >= len && b.device_address().is_aligned(align));
        if !fits {
            self.buf = None;
            self.buf = dma.alloc(len, align);
        }
        self.buf.as_mut()
    }
}

impl<A: DmaAllocator + ?Sized> DmaAllocator for &mut A {
    type Buffer = A::Buffer;

    #[inline]
    fn alloc(&mut self, len: usize, align: u64) -> Option<Self::Buffer> {
        (**self).alloc(len, align)
    }
}
