use display_addresses::{PhysicalPage, Size4K};
use bitfield_struct::bitfield;

/// One translation table entry: the frame number of a 4 KiB page.
///
/// | Bits  | Field | Meaning |
/// |-------|-------|---------|
/// | 0–27  | `pfn` | Physical address bits \[39:12\] |
/// | 28–31 | –     | Reserved, zero |
///
/// The hardware has no valid bit: every entry up to the programmed table
/// size is fetched, which is why tables are padded with copies of the last
/// real entry instead of zeroes.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct TableEntry {
    #[bits(28)]
    pub pfn: u32,
    #[bits(4)]
    __: u8,
}

/// Highest frame number an entry can hold.
pub const MAX_PFN: u64 = (1 << 28) - 1;

impl TableEntry {
    /// Entry mapping `page`, or `None` if the frame lies beyond the
    /// addressable range.
    #[must_use]
    pub fn for_page(page: PhysicalPage<Size4K>) -> Option<Self> {
        let pfn = u32::try_from(page.pfn()).ok().filter(|&p| u64::from(p) <= MAX_PFN)?;
        Some(Self::new().with_pfn(pfn))
    }

    /// The mapped page.
    #[inline]
    #[must_use]
    pub fn page(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_pfn(u64::from(self.pfn()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_addresses::PhysicalAddress;

    #[test]
    fn entry_is_the_frame_number() {
        let page = PhysicalAddress::new(0x8_1234_5000).page::<Size4K>();
        let e = TableEntry::for_page(page).unwrap();
        assert_eq!(e.into_bits(), 0x0081_2345);
        assert_eq!(e.page(), page);
    }

    #[test]
    fn frames_beyond_40_bits_are_rejected() {
        let page = PhysicalPage::<Size4K>::from_pfn(MAX_PFN + 1);
        assert!(TableEntry::for_page(page).is_none());
    }
}
