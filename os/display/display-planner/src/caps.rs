use crate::request::PlaneRequest;
use display_info::hw::MAX_CHANNELS;
use display_info::surface::Rotation;

bitflags::bitflags! {
    /// What a fetch channel can do with the surfaces routed to it.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ChannelCaps: u32 {
        /// Single-plane RGB formats.
        const RGB        = 1 << 0;
        /// Multi-planar YUV formats.
        const YUV        = 1 << 1;
        /// Block-compressed surfaces.
        const AFBC       = 1 << 2;
        const ROTATE_90  = 1 << 3;
        const ROTATE_180 = 1 << 4;
        const ROTATE_270 = 1 << 5;
        /// Can be routed through a scaler.
        const SCALE      = 1 << 6;
    }
}

impl ChannelCaps {
    /// Even channels of the reference integration: full video pipes.
    pub const VIDEO: Self = Self::all();

    /// Odd channels of the reference integration: RGB overlays.
    pub const GRAPHICS: Self = Self::RGB.union(Self::AFBC).union(Self::ROTATE_180);

    /// Capabilities of `channel` in the reference integration.
    #[must_use]
    pub const fn reference(channel: u8) -> Self {
        if channel.is_multiple_of(2) {
            Self::VIDEO
        } else {
            Self::GRAPHICS
        }
    }

    /// Capabilities needed to scan out `plane`.
    #[must_use]
    pub fn required_by<S: ?Sized>(plane: &PlaneRequest<'_, S>) -> Self {
        let surface = &plane.surface;
        let mut caps = if surface.format.is_yuv() {
            Self::YUV
        } else {
            Self::RGB
        };
        if surface.compression.is_compressed() {
            caps |= Self::AFBC;
        }
        caps |= match surface.rotation {
            Rotation::Deg0 => Self::empty(),
            Rotation::Deg90 => Self::ROTATE_90,
            Rotation::Deg180 => Self::ROTATE_180,
            Rotation::Deg270 => Self::ROTATE_270,
        };
        if plane.scaler.is_some() {
            caps |= Self::SCALE;
        }
        caps
    }
}

/// Static per-channel capability table.
pub type CapsTable = [ChannelCaps; MAX_CHANNELS as usize];

/// The reference integration's capability table.
#[must_use]
pub fn reference_caps() -> CapsTable {
    core::array::from_fn(|ch| ChannelCaps::reference(u8::try_from(ch).unwrap_or(u8::MAX)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlays_lack_video_features() {
        let caps = reference_caps();
        assert_eq!(caps[0], ChannelCaps::all());
        assert!(!caps[1].contains(ChannelCaps::YUV | ChannelCaps::SCALE));
        assert!(caps[3].contains(ChannelCaps::AFBC));
    }
}
