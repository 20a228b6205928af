//! # Surface Vocabulary
//!
//! Descriptive types the compositor uses when handing a surface to the
//! planner. They carry no behavior beyond their hardware encodings.

/// Scan-out rotation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Two-bit hardware encoding.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// The channel fetches columns instead of lines.
    #[inline]
    #[must_use]
    pub const fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Block geometry of a compressed surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlockSize {
    B16x16,
    B32x8,
}

impl BlockSize {
    #[inline]
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::B16x16 => 16,
            Self::B32x8 => 32,
        }
    }

    #[inline]
    #[must_use]
    pub const fn height(self) -> u32 {
        match self {
            Self::B16x16 => 16,
            Self::B32x8 => 8,
        }
    }
}

/// Compression modifier of a surface.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Compression {
    #[default]
    None,
    /// Block-compressed (AFBC) with the given block geometry.
    Afbc(BlockSize),
}

impl Compression {
    #[inline]
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Afbc(_))
    }

    #[inline]
    #[must_use]
    pub const fn block(self) -> Option<BlockSize> {
        match self {
            Self::None => None,
            Self::Afbc(b) => Some(b),
        }
    }
}

/// Crop rectangle in source pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
