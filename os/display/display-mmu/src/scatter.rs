use alloc::vec::Vec;
use display_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

/// One physically contiguous run of a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Segment {
    /// Page-aligned start.
    pub start: PhysicalAddress,
    pub len: u64,
}

impl Segment {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, len: u64) -> Self {
        debug_assert!(start.is_aligned::<Size4K>());
        Self { start, len }
    }

    /// Address one past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.start.as_u64() + self.len)
    }
}

/// Scatter-gather description of a surface's backing memory, as provided by
/// the memory-management collaborator.
pub trait ScatterList {
    /// The physical runs of the buffer, in buffer order.
    fn segments(&self) -> impl Iterator<Item = Segment>;

    /// Start of the buffer if all of it is one physically contiguous run
    /// of at least `len` bytes.
    fn contiguous(&self, len: u64) -> Option<PhysicalAddress> {
        let mut runs = self.segments();
        let first = runs.next()?;
        let mut end = first.end();
        for seg in runs {
            if seg.start != end {
                return None;
            }
            end = seg.end();
        }
        (end.as_u64() - first.start.as_u64() >= len).then_some(first.start)
    }

    /// Every 4 KiB page of the buffer, in order.
    fn pages(&self) -> impl Iterator<Item = PhysicalPage<Size4K>> {
        self.segments().flat_map(|seg| {
            let first = seg.start.page::<Size4K>();
            let count = usize::try_from(seg.len.div_ceil(Size4K::SIZE)).unwrap_or(usize::MAX);
            core::iter::successors(Some(first), |p| Some(p.next())).take(count)
        })
    }
}

/// An owned segment list.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SgTable {
    segments: Vec<Segment>,
}

impl SgTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// A buffer consisting of one contiguous run.
    #[must_use]
    pub fn contiguous_run(start: PhysicalAddress, len: u64) -> Self {
        let mut sg = Self::new();
        sg.push(Segment::new(start, len));
        sg
    }

    /// A buffer made of whole, individually placed pages.
    #[must_use]
    pub fn from_pages(pages: impl IntoIterator<Item = PhysicalPage<Size4K>>) -> Self {
        let mut sg = Self::new();
        for page in pages {
            sg.push(Segment::new(page.base(), Size4K::SIZE));
        }
        sg
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Total bytes described.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.segments.iter().map(|s| s.len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl ScatterList for SgTable {
    fn segments(&self) -> impl Iterator<Item = Segment> {
        self.segments.iter().copied()
    }
}

impl<T: ScatterList + ?Sized> ScatterList for &T {
    fn segments(&self) -> impl Iterator<Item = Segment> {
        (**self).segments()
    }
}
