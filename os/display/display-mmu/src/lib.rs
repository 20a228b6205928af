//! # Page-Table Binder
//!
//! Turns a surface's scatter-gather page list into the display engine's
//! translation tables and computes the fetch base address of every plane.
//!
//! ## Address spaces
//!
//! Each channel owns a fixed window of device virtual addresses. A surface
//! is laid out in that window exactly as it is laid out in its buffer, and
//! each memory plane gets its own table covering its slice of the window:
//!
//! ```text
//!   channel window (VA)
//!   ┌───────────────┬──────────┬──────────┐
//!   │    plane 0    │ plane 1  │ plane 2  │
//!   └───────┬───────┴────┬─────┴────┬─────┘
//!           │ table 0    │ table 1  │ table 2      one PFN per 4 KiB page,
//!           ▼            ▼          ▼              padded with copies of the
//!        [pfn pfn … pfn pad…][pfn … pad…][…]       last entry
//!            one device buffer per plane state
//! ```
//!
//! Block-compressed surfaces are fetched through a single table; the second
//! table slot aliases the first (same base, size and window).
//!
//! ## Fast path
//!
//! A buffer that is one physically contiguous run needs no tables at all:
//! the binder disables translation for the channel and programs the physical
//! plane addresses directly.
//!
//! ## Table geometry
//!
//! | Quantity | Value |
//! |----------|-------|
//! | Entry | 32-bit [`TableEntry`], PFN of a 4 KiB page |
//! | Real entries | pages spanned by the plane |
//! | Padding | `mmu_pad_entries` copies of the last real entry |
//! | Table length | rounded up to `mmu_align_entries` entries |

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod binding;
mod entry;
mod scatter;

pub use binding::{Binding, TableWindow};
pub use entry::{MAX_PFN, TableEntry};
pub use scatter::{ScatterList, Segment, SgTable};

use alloc::vec::Vec;
use display_addresses::{DeviceAddress, PageSize, PhysicalAddress, Size4K, align_down, align_up};
use display_dma::{DmaAllocator, DmaMemory, DmaSlot};
use display_info::EngineConfig;
use display_info::hw::MAX_PLANES;
use display_info::surface::Compression;

/// Memory layout of a surface as seen by the binder.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceLayout {
    /// Bytes of the backing buffer.
    pub size: u64,
    /// Memory planes in use, 1 to 3.
    pub planes: u8,
    /// Byte offset of each plane in the buffer. A plane ends where the next
    /// one starts, the last one at `size`. A zero offset for plane 1 or 2
    /// means the plane is absent and starts at `size`.
    pub offsets: [u64; MAX_PLANES],
    pub compression: Compression,
}

impl SurfaceLayout {
    /// A single-plane surface.
    #[must_use]
    pub const fn single(size: u64, compression: Compression) -> Self {
        Self {
            size,
            planes: 1,
            offsets: [0; MAX_PLANES],
            compression,
        }
    }

    /// Byte offset of plane `i`.
    #[must_use]
    pub const fn plane_offset(&self, i: usize) -> u64 {
        match self.offsets[i] {
            0 if i > 0 => self.size,
            offset => offset,
        }
    }

    /// Byte range `[start, end)` of plane `i`. Absent planes are empty.
    #[must_use]
    pub const fn plane_range(&self, i: usize) -> (u64, u64) {
        let end = if i + 1 < self.planes as usize {
            self.plane_offset(i + 1)
        } else {
            self.size
        };
        (self.plane_offset(i), end)
    }

    fn validate(&self) -> Result<(), MmuError> {
        if self.size == 0 || self.planes == 0 || usize::from(self.planes) > MAX_PLANES {
            return Err(MmuError::BadLayout);
        }
        for i in 0..usize::from(self.planes) {
            let (start, end) = self.plane_range(i);
            let absent = i > 0 && start == self.size;
            if start > end || (start == end && !absent) {
                return Err(MmuError::BadLayout);
            }
        }
        Ok(())
    }
}

/// Builds translation tables and plane bases for one display engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MmuBinder {
    channels: u8,
    va_base: u64,
    window: u64,
    pad: usize,
    align: usize,
    max_entries: usize,
}

impl MmuBinder {
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            channels: config.channels,
            va_base: config.mmu_va_base,
            window: config.mmu_window_bytes,
            pad: config.mmu_pad_entries,
            align: config.mmu_align_entries,
            max_entries: config.mmu_table_max_entries,
        }
    }

    /// Entries of a table mapping `pages` pages, padding and alignment included.
    #[inline]
    #[must_use]
    pub const fn table_len(&self, pages: usize) -> usize {
        (pages + self.pad).next_multiple_of(self.align)
    }

    /// Byte alignment of a table in device memory.
    #[inline]
    #[must_use]
    pub const fn table_align(&self) -> u64 {
        (self.align as u64 * 4).next_power_of_two()
    }

    /// Map `layout` for `channel`.
    ///
    /// Tables are written into the buffer held by `tables`, which is grown
    /// through `dma` when too small. The contiguous fast path leaves it
    /// untouched.
    ///
    /// # Errors
    /// * [`MmuError::PageListExhausted`] if `sg` describes less memory than
    ///   the layout declares.
    /// * [`MmuError::TableTooLarge`] / [`MmuError::WindowOverflow`] when the
    ///   surface does not fit the hardware limits.
    /// * [`MmuError::OutOfMemory`] if no table buffer can be allocated.
    pub fn bind<S, A>(
        &self,
        channel: u8,
        layout: &SurfaceLayout,
        sg: &S,
        dma: &mut A,
        tables: &mut DmaSlot<A::Buffer>,
    ) -> Result<Binding, MmuError>
    where
        S: ScatterList + ?Sized,
        A: DmaAllocator + ?Sized,
    {
        if channel >= self.channels {
            return Err(MmuError::InvalidChannel(channel));
        }
        layout.validate()?;

        let mut binding = Binding::new(channel, layout.planes);
        if let Some(pa) = sg.contiguous(layout.size) {
            log::debug!("MMU: channel {channel} scans out contiguous memory at {pa}");
            for i in 0..usize::from(layout.planes) {
                binding.set_base(i, DeviceAddress::new((pa + layout.plane_offset(i)).as_u64()));
            }
            return Ok(binding);
        }

        let size = align_up(layout.size, Size4K::SIZE);
        if size > self.window {
            return Err(MmuError::WindowOverflow {
                size,
                window: self.window,
            });
        }

        let expected = usize::try_from(size / Size4K::SIZE).map_err(|_| MmuError::BadLayout)?;
        let entries = collect_entries(sg, expected)?;

        // Page ranges backing each table slot; compressed surfaces use one,
        // absent planes none.
        let mut ranges = [(0usize, 0usize); MAX_PLANES];
        let slots = if layout.compression.is_compressed() {
            ranges[0] = (0, expected);
            1
        } else {
            let mut slots = 0;
            for i in 0..usize::from(layout.planes) {
                let (start, end) = layout.plane_range(i);
                if start == end {
                    continue;
                }
                ranges[slots] = (page_index(align_down(start, Size4K::SIZE)), page_index(align_up(end, Size4K::SIZE)));
                slots += 1;
            }
            slots
        };

        let mut total = 0;
        for &(first, last) in &ranges[..slots] {
            let len = self.table_len(last - first);
            if len > self.max_entries {
                return Err(MmuError::TableTooLarge {
                    entries: len,
                    max: self.max_entries,
                });
            }
            total += len;
        }

        let bytes = total * 4;
        let Some(buf) = tables.ensure(dma, bytes, self.table_align()) else {
            log::warn!("MMU: no device memory for {bytes} bytes of tables on channel {channel}");
            return Err(MmuError::OutOfMemory { bytes });
        };

        let window = self.va_base + u64::from(channel) * self.window;
        let mut cursor = 0;
        for (slot, &(first, last)) in ranges[..slots].iter().enumerate() {
            let len = self.table_len(last - first);
            let real = &entries[first..last];
            let pad = real.last().map_or(0, |e| e.into_bits());
            let words: Vec<u32> = real
                .iter()
                .map(|e| e.into_bits())
                .chain(core::iter::repeat(pad))
                .take(len)
                .collect();
            buf.write_words(cursor * 4, &words);

            let va = window + first as u64 * Size4K::SIZE;
            binding.set_table(
                slot,
                TableWindow {
                    base: buf.device_address() + cursor as u64 * 4,
                    va: u32::try_from(va).map_err(|_| MmuError::BadLayout)?,
                    size: u32::try_from((last - first) as u64 * Size4K::SIZE).map_err(|_| MmuError::BadLayout)?,
                    entries: len,
                },
            );
            cursor += len;
        }
        if layout.compression.is_compressed() {
            binding.alias_first_table();
        }
        for i in 0..usize::from(layout.planes) {
            binding.set_base(i, DeviceAddress::new(window + layout.plane_offset(i)));
        }

        log::debug!(
            "MMU: channel {channel} mapped {expected} pages through {slots} table(s), {total} entries"
        );
        Ok(binding)
    }
}

fn page_index(offset: u64) -> usize {
    usize::try_from(offset / Size4K::SIZE).unwrap_or(usize::MAX)
}

/// Walk the page list for the first `expected` pages.
fn collect_entries<S: ScatterList + ?Sized>(sg: &S, expected: usize) -> Result<Vec<TableEntry>, MmuError> {
    let mut entries = Vec::with_capacity(expected);
    for page in sg.pages().take(expected) {
        let entry = TableEntry::for_page(page).ok_or(MmuError::AddressTooWide(page.base()))?;
        entries.push(entry);
    }
    if entries.len() < expected {
        log::error!(
            "MMU: page list ended after {} of {expected} pages",
            entries.len()
        );
        return Err(MmuError::PageListExhausted {
            expected,
            got: entries.len(),
        });
    }
    Ok(entries)
}

/// Translation failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MmuError {
    #[error("channel {0} has no fetch window")]
    InvalidChannel(u8),
    #[error("surface plane layout is inconsistent")]
    BadLayout,
    #[error("surface of {size:#x} bytes exceeds the {window:#x} byte fetch window")]
    WindowOverflow { size: u64, window: u64 },
    #[error("translation table of {entries} entries exceeds the limit of {max}")]
    TableTooLarge { entries: usize, max: usize },
    #[error("page list ended after {got} of {expected} pages")]
    PageListExhausted { expected: usize, got: usize },
    #[error("page at {0} is beyond the translatable range")]
    AddressTooWide(PhysicalAddress),
    #[error("no device memory for {bytes} bytes of translation tables")]
    OutOfMemory { bytes: usize },
}

impl MmuError {
    /// The surface exceeds a hardware limit rather than being malformed.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::WindowOverflow { .. } | Self::TableTooLarge { .. })
    }
}
