use display_info::hw::FBC_UNIT_BYTES;
use display_info::surface::{Compression, Rotation};

/// How the memory planes of one surface share the channel's FBC window.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum WorkMode {
    /// Planes are decoded side by side; their line buffers are summed.
    #[default]
    SideBySide,
    /// Planes are decoded one after another in the same region; the largest wins.
    Stacked,
}

/// The parts of a surface that determine its FBC working set.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FbcSurface<'a> {
    pub compression: Compression,
    pub rotation: Rotation,
    pub crop_width: u16,
    pub crop_height: u16,
    /// Bytes per pixel of each memory plane.
    pub bytes_per_pixel: &'a [u8],
    /// Subsampling divisor of each memory plane along the fetched line; 2
    /// for the chroma planes of 4:2:0 formats. Missing entries count as 1.
    pub subsampling: &'a [u8],
}

/// One channel's FBC requirement for the frame, in [`FBC_UNIT_BYTES`] units.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FbcRequest {
    pub channel: u8,
    pub units: u32,
}

impl FbcRequest {
    #[inline]
    #[must_use]
    pub const fn new(channel: u8, units: u32) -> Self {
        Self { channel, units }
    }

    /// Requirement of `bytes`, rounded up to whole units.
    #[must_use]
    pub fn from_bytes(channel: u8, bytes: u64) -> Self {
        let units = bytes.div_ceil(u64::from(FBC_UNIT_BYTES));
        Self::new(channel, u32::try_from(units).unwrap_or(u32::MAX))
    }

    /// Combine per-plane byte requirements according to `mode`.
    ///
    /// ```
    /// # use display_fbc::{FbcRequest, WorkMode};
    /// let planes = [640, 320];
    /// assert_eq!(FbcRequest::from_planes(0, planes, WorkMode::SideBySide).units, 30);
    /// assert_eq!(FbcRequest::from_planes(0, planes, WorkMode::Stacked).units, 20);
    /// ```
    #[must_use]
    pub fn from_planes(channel: u8, plane_bytes: impl IntoIterator<Item = u64>, mode: WorkMode) -> Self {
        let planes = plane_bytes.into_iter();
        let bytes = match mode {
            WorkMode::SideBySide => planes.fold(0, u64::saturating_add),
            WorkMode::Stacked => planes.max().unwrap_or(0),
        };
        Self::from_bytes(channel, bytes)
    }

    /// Derive the requirement of a surface scanned out by `channel`.
    ///
    /// Uncompressed surfaces need no FBC memory. A compressed plane needs one
    /// row of blocks across the fetched line: the crop width, or the crop
    /// height when the channel fetches columns. Subsampled planes cover a
    /// proportionally shorter line.
    #[must_use]
    pub fn for_surface(channel: u8, surface: &FbcSurface<'_>, mode: WorkMode) -> Self {
        let Some(block) = surface.compression.block() else {
            return Self::new(channel, 0);
        };
        let line = if surface.rotation.is_transposed() {
            surface.crop_height
        } else {
            surface.crop_width
        };
        let planes = surface.bytes_per_pixel.iter().enumerate().map(|(i, &bpp)| {
            let sub = surface.subsampling.get(i).map_or(1, |&s| u64::from(s.max(1)));
            let line = u64::from(line)
                .div_ceil(sub)
                .next_multiple_of(u64::from(block.width()));
            line * u64::from(block.height()) * u64::from(bpp)
        });
        Self::from_planes(channel, planes, mode)
    }

    /// Requirement in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.units as u64 * FBC_UNIT_BYTES as u64
    }
}
