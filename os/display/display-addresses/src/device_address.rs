use core::fmt;
use core::ops::Add;

/// Address as seen by the display engine.
///
/// Fetch base registers, translation-table base registers and command-list
/// pointers all take a `DeviceAddress`. Registers are 32 bits wide, so wide
/// addresses are programmed as a [`lo`](Self::lo)/[`hi`](Self::hi) pair.
///
/// ### Examples
/// ```rust
/// # use display_addresses::DeviceAddress;
/// let da = DeviceAddress::new(0x2_0000_1000);
/// assert_eq!((da.hi(), da.lo()), (0x2, 0x1000));
/// assert!(da.is_aligned(64));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Low 32 bits, as written to a `*_LO` register.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn lo(self) -> u32 {
        self.0 as u32
    }

    /// High 32 bits, as written to a `*_HI` register.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn hi(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Whether the address is representable in a `bits`-wide register field.
    #[inline]
    #[must_use]
    pub const fn fits_bits(self, bits: u32) -> bool {
        bits >= u64::BITS || self.0 >> bits == 0
    }

    /// Whether the address is a multiple of `align` (a power of two).
    #[inline]
    #[must_use]
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }
}

impl fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DA(0x{:010X})", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:010X}", self.0)
    }
}

impl From<u64> for DeviceAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for DeviceAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
