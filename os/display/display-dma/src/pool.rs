use crate::{DmaAllocator, DmaMemory};
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use display_addresses::DeviceAddress;

/// Block occupancy of the pool, shared between the allocator and its live
/// buffers so that a dropped buffer can return its blocks.
#[derive(Debug)]
struct PoolState {
    /// One bit per block, set while the block is handed out.
    used: Vec<u64>,
    blocks: usize,
    live: usize,
}

impl PoolState {
    fn is_used(&self, block: usize) -> bool {
        self.used[block / 64] & (1 << (block % 64)) != 0
    }

    fn mark(&mut self, first: usize, count: usize, used: bool) {
        for block in first..first + count {
            let bit = 1u64 << (block % 64);
            if used {
                self.used[block / 64] |= bit;
            } else {
                self.used[block / 64] &= !bit;
            }
        }
    }

    /// First-fit search for `count` free blocks starting at a multiple of `step`.
    fn find_run(&self, count: usize, step: usize) -> Option<usize> {
        let mut first = 0;
        while first + count <= self.blocks {
            match (first..first + count).find(|&b| self.is_used(b)) {
                None => return Some(first),
                Some(busy) => first = (busy / step + 1) * step,
            }
        }
        None
    }
}

/// Fixed device address range handed out in whole blocks.
///
/// Single-threaded by construction: buffers share the occupancy map through
/// an `Rc`, so neither the allocator nor its buffers are `Send`.
pub struct PoolDmaAllocator {
    base: DeviceAddress,
    block_size: u64,
    state: Rc<RefCell<PoolState>>,
}

impl PoolDmaAllocator {
    /// Manage `blocks` blocks of `block_size` bytes starting at `base`.
    ///
    /// # Panics
    /// If `block_size` is not a power of two or `base` is not block aligned.
    #[must_use]
    pub fn new(base: DeviceAddress, blocks: usize, block_size: u64) -> Self {
        assert!(block_size.is_power_of_two(), "block size must be a power of two");
        assert!(base.is_aligned(block_size), "pool base must be block aligned");
        Self {
            base,
            block_size,
            state: Rc::new(RefCell::new(PoolState {
                used: vec![0; blocks.div_ceil(64)],
                blocks,
                live: 0,
            })),
        }
    }

    /// Number of buffers currently alive.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().live
    }

    /// Number of blocks not handed out.
    #[must_use]
    pub fn free_blocks(&self) -> usize {
        let state = self.state.borrow();
        (0..state.blocks).filter(|&b| !state.is_used(b)).count()
    }
}

impl fmt::Debug for PoolDmaAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolDmaAllocator")
            .field("base", &self.base)
            .field("block_size", &self.block_size)
            .field("live", &self.live_buffers())
            .field("free_blocks", &self.free_blocks())
            .finish()
    }
}

impl DmaAllocator for PoolDmaAllocator {
    type Buffer = PoolBuffer;

    fn alloc(&mut self, len: usize, align: u64) -> Option<PoolBuffer> {
        let count = usize::try_from((len as u64).div_ceil(self.block_size))
            .ok()?
            .max(1);
        let step = usize::try_from(align.div_ceil(self.block_size).max(1)).ok()?;

        let mut state = self.state.borrow_mut();
        let Some(first) = state.find_run(count, step) else {
            log::warn!("DMA pool exhausted: {len} bytes requested");
            return None;
        };
        state.mark(first, count, true);
        state.live += 1;
        drop(state);

        let addr = self.base + first as u64 * self.block_size;
        log::trace!("DMA alloc {len} bytes at {addr}");
        Some(PoolBuffer {
            addr,
            data: vec![0; len],
            first,
            count,
            pool: Rc::clone(&self.state),
        })
    }
}

/// A buffer from [`PoolDmaAllocator`]; its blocks return to the pool on drop.
pub struct PoolBuffer {
    addr: DeviceAddress,
    data: Vec<u8>,
    first: usize,
    count: usize,
    pool: Rc<RefCell<PoolState>>,
}

impl fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("addr", &self.addr)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl DmaMemory for PoolBuffer {
    #[inline]
    fn device_address(&self) -> DeviceAddress {
        self.addr
    }

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        let mut state = self.pool.borrow_mut();
        state.mark(self.first, self.count, false);
        state.live -= 1;
        log::trace!("DMA free {} bytes at {}", self.data.len(), self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(blocks: usize) -> PoolDmaAllocator {
        PoolDmaAllocator::new(DeviceAddress::new(0x8000_0000), blocks, 0x100)
    }

    #[test]
    fn buffers_are_zeroed_and_block_aligned() {
        let mut dma = pool(8);
        let a = dma.alloc(10, 4).unwrap();
        let b = dma.alloc(0x101, 4).unwrap();
        assert_eq!(a.device_address().as_u64(), 0x8000_0000);
        assert_eq!(b.device_address().as_u64(), 0x8000_0100);
        assert!(b.as_bytes().iter().all(|&x| x == 0));
        assert_eq!(b.len(), 0x101);
        assert_eq!(dma.free_blocks(), 5);
    }

    #[test]
    fn drop_returns_blocks() {
        let mut dma = pool(4);
        let a = dma.alloc(0x400, 64).unwrap();
        assert!(dma.alloc(1, 64).is_none());
        assert_eq!(dma.live_buffers(), 1);
        drop(a);
        assert_eq!(dma.live_buffers(), 0);
        assert_eq!(dma.free_blocks(), 4);
        assert!(dma.alloc(1, 64).is_some());
    }

    #[test]
    fn large_alignment_skips_blocks() {
        let mut dma = pool(8);
        let _a = dma.alloc(1, 1).unwrap();
        let b = dma.alloc(1, 0x400).unwrap();
        assert_eq!(b.device_address().as_u64(), 0x8000_0400);
    }

    #[test]
    fn freed_hole_is_reused_first_fit() {
        let mut dma = pool(8);
        let a = dma.alloc(0x200, 1).unwrap();
        let _b = dma.alloc(0x100, 1).unwrap();
        drop(a);
        let c = dma.alloc(0x180, 1).unwrap();
        assert_eq!(c.device_address().as_u64(), 0x8000_0000);
    }

    #[test]
    fn slot_reuses_until_it_must_grow() {
        let mut dma = pool(8);
        let mut slot = crate::DmaSlot::empty();
        let first = slot.ensure(&mut dma, 0x100, 64).unwrap().device_address();
        let again = slot.ensure(&mut dma, 0x80, 64).unwrap().device_address();
        assert_eq!(first, again);
        assert_eq!(dma.live_buffers(), 1);

        slot.ensure(&mut dma, 0x300, 64).unwrap();
        assert_eq!(dma.live_buffers(), 1);
        assert_eq!(dma.free_blocks(), 5);

        drop(slot);
        assert_eq!(dma.live_buffers(), 0);
    }

    #[test]
    fn exhausted_slot_is_left_empty() {
        let mut dma = pool(2);
        let mut slot = crate::DmaSlot::empty();
        slot.ensure(&mut dma, 0x100, 64).unwrap();
        assert!(slot.ensure(&mut dma, 0x1000, 64).is_none());
        assert!(!slot.is_allocated());
        assert_eq!(dma.live_buffers(), 0);
    }

    #[test]
    fn words_are_little_endian() {
        let mut dma = pool(1);
        let mut buf = dma.alloc(8, 4).unwrap();
        buf.write_words(0, &[0x1122_3344, 0xAABB_CCDD]);
        assert_eq!(buf.as_bytes(), &[0x44, 0x33, 0x22, 0x11, 0xDD, 0xCC, 0xBB, 0xAA]);
    }
}
