//! # Physical and Device Address Types
//!
//! Strongly typed wrappers for the two address spaces the display pipeline
//! planner juggles.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A CPU physical address as handed out by the memory manager (scatter-gather pages). |
//! | [`PhysicalPage<S>`] | A page-aligned physical frame of size `S`; the unit a translation table entry refers to. |
//! | [`DeviceAddress`] | An address as seen by the display engine's fetch units and sequencer: either a bus address of a contiguous buffer or a virtual address inside a channel's translated fetch window. |
//!
//! Mixing the two spaces is the classic way to program a fetch unit with a
//! CPU address, so they do not convert into each other implicitly.
//!
//! ## Page Sizes
//!
//! Page granularity is carried at the type level through [`PageSize`]
//! markers. The translation hardware works on [`Size4K`] frames.
//!
//! ```rust
//! # use display_addresses::*;
//! let pa = PhysicalAddress::new(0x8_1234_5678);
//! let page = pa.page::<Size4K>();
//! assert_eq!(page.base().as_u64(), 0x8_1234_5000);
//! assert_eq!(page.pfn(), 0x81_2345);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod device_address;
mod physical_address;
mod physical_page;

pub use crate::device_address::DeviceAddress;
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;

use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;
}

/// 4 KiB page (4096 bytes), the translation table granule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;
}

const _: () = {
    assert!(Size4K::SIZE == 1 << Size4K::SHIFT);
};

/// Align `x` down to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two.
///
/// ```rust
/// # use display_addresses::align_down;
/// assert_eq!(align_down(4095, 4096), 0);
/// assert_eq!(align_down(8191, 4096), 4096);
/// assert_eq!(align_down(0x12345, 16), 0x12340);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    x & !(a - 1)
}

/// Align `x` up to the nearest multiple of `a`.
///
/// `a` must be a non-zero power of two and `x + a - 1` must not overflow.
///
/// ```rust
/// # use display_addresses::align_up;
/// assert_eq!(align_up(0, 4096), 0);
/// assert_eq!(align_up(1, 4096), 4096);
/// assert_eq!(align_up(4096, 4096), 4096);
/// assert_eq!(align_up(0x12345, 16), 0x12350);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64, a: u64) -> u64 {
    debug_assert!(a.is_power_of_two());
    (x + a - 1) & !(a - 1)
}
