use crate::{PageSize, PhysicalAddress};
use core::fmt;
use core::marker::PhantomData;

/// Physical memory page base for size `S`.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use display_addresses::*;
/// let pp = PhysicalPage::<Size4K>::containing(0x8_1234_5678);
/// assert_eq!(pp.base().as_u64(), 0x8_1234_5000);
/// assert_eq!(pp.pfn(), 0x8_1234_5000 >> 12);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: u64) -> Self {
        Self {
            value: addr & !(S::SIZE - 1),
            _phantom: PhantomData,
        }
    }

    /// Page that contains `pa`.
    #[inline]
    #[must_use]
    pub const fn from_addr(pa: PhysicalAddress) -> Self {
        Self::containing(pa.as_u64())
    }

    /// Page with frame number `pfn`.
    #[inline]
    #[must_use]
    pub const fn from_pfn(pfn: u64) -> Self {
        Self::containing(pfn << S::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.value)
    }

    /// Page frame number (`base >> S::SHIFT`).
    #[inline]
    #[must_use]
    pub const fn pfn(self) -> u64 {
        self.value >> S::SHIFT
    }

    /// The page directly following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self::containing(self.value + S::SIZE)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>({:#018X})",
            core::any::type_name::<S>(),
            self.value
        )
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.value, S::SIZE)
    }
}
