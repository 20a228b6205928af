//! # Typed Control Register Layouts
//!
//! Bit-level views of the control registers the planner composes, modelled
//! with [`bitfield_struct`](https://docs.rs/bitfield-struct/) so that values
//! are built with named setters instead of shifts and masks.

use bitfield_struct::bitfield;

/// `CHAN.CTRL`: pixel-fetch channel control.
///
/// | Bits  | Field        | Meaning |
/// |-------|--------------|---------|
/// | 0     | `enable`     | Channel fetches this frame |
/// | 1–6   | `format`     | Hardware pixel format code |
/// | 7–8   | `rotation`   | 0°, 90°, 180°, 270° |
/// | 9     | `compressed` | Surface is block compressed |
/// | 10    | `block_32x8` | Compression block is 32×8 (else 16×16) |
/// | 11    | `translated` | Fetch through the channel's translation tables |
/// | 12–13 | `planes`     | Number of memory planes (1–3) |
/// | 14    | `fbc`        | Channel owns an FBC window this frame |
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ChannelCtrl {
    pub enable: bool,
    #[bits(6)]
    pub format: u8,
    #[bits(2)]
    pub rotation: u8,
    pub compressed: bool,
    pub block_32x8: bool,
    pub translated: bool,
    #[bits(2)]
    pub planes: u8,
    pub fbc: bool,
    #[bits(17)]
    __: u32,
}

/// `CHAN.FBC_CTRL`: FBC window routing.
///
/// A channel whose window does not fit its own pool draws the remainder
/// from `spill_pool`; `split` marks that case. `shared` is set when the
/// paired channel holds a window in the same pool this frame.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct FbcCtrl {
    pub enable: bool,
    pub split: bool,
    pub shared: bool,
    #[bits(4)]
    pub pool: u8,
    #[bits(4)]
    pub spill_pool: u8,
    #[bits(21)]
    __: u32,
}

/// `MMU.CTRL`: translation control for one channel.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MmuCtrl {
    pub enable: bool,
    /// Number of translation table slots programmed.
    #[bits(2)]
    pub tables: u8,
    /// Table 1 aliases table 0 (block-compressed surfaces).
    pub alias: bool,
    #[bits(28)]
    __: u32,
}

/// `CHAN.SCALER_SEL`: scaler routing for the channel.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ScalerSel {
    pub enable: bool,
    #[bits(4)]
    pub scaler: u8,
    #[bits(27)]
    __: u32,
}

/// Pack an `(x, y)` or `(w, h)` pair into a position/size register.
#[inline]
#[must_use]
pub const fn pack_xy(x: u16, y: u16) -> u32 {
    (y as u32) << 16 | x as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_ctrl_bits() {
        let ctrl = ChannelCtrl::new()
            .with_enable(true)
            .with_format(0x21)
            .with_rotation(3)
            .with_planes(2);
        assert_eq!(ctrl.into_bits(), 1 | 0x21 << 1 | 3 << 7 | 2 << 12);
    }

    #[test]
    fn fbc_ctrl_split_routing() {
        let ctrl = FbcCtrl::new()
            .with_enable(true)
            .with_split(true)
            .with_pool(0)
            .with_spill_pool(1);
        assert_eq!(ctrl.into_bits(), 0b11 | 1 << 7);
    }

    #[test]
    fn xy_packing() {
        assert_eq!(pack_xy(0x10, 0x20), 0x0020_0010);
    }
}
