//! # Register Map
//!
//! Block descriptors and field offsets of the display engine.
//!
//! | Block | Base | Stride | Instances | Role |
//! |-------|------|--------|-----------|------|
//! | [`TOP`] | `0x0000` | – | 1 | Global channel enable and commit latch |
//! | [`CHAN`] | `0x1000` | `0x100` | one per channel | Pixel-fetch channel: format, bases, FBC window, command-list pointers |
//! | [`MMU`] | `0x3000` | `0x80` | one per channel | Translation table bases and virtual windows |
//!
//! Fields that are written together (base address halves, the FBC window,
//! the next-list pointer) sit in consecutive words so the command-list
//! builder can merge them into a single row.

use crate::RegisterBlock;
use display_info::hw::{MAX_CHANNELS, MAX_PLANES};

/// Top-level fields.
pub mod top {
    use crate::FieldOffset;

    /// Channel enable bitmask, written directly at commit.
    pub const CHANNEL_EN: FieldOffset = FieldOffset(0x00);
    /// Write-1-to-set view of [`CHANNEL_EN`]; the terminal command row targets this.
    pub const CHANNEL_EN_SET: FieldOffset = FieldOffset(0x04);
    /// Write-1-to-clear view of [`CHANNEL_EN`].
    pub const CHANNEL_EN_CLR: FieldOffset = FieldOffset(0x08);
    /// Latches the staged configuration at the next vertical blank.
    pub const COMMIT: FieldOffset = FieldOffset(0x0C);
    pub const STATUS: FieldOffset = FieldOffset(0x10);
}

/// Per-channel fetch fields.
pub mod chan {
    use crate::FieldOffset;

    pub const CTRL: FieldOffset = FieldOffset(0x00);
    pub const CROP_POS: FieldOffset = FieldOffset(0x04);
    pub const CROP_SIZE: FieldOffset = FieldOffset(0x08);
    pub const DST_POS: FieldOffset = FieldOffset(0x0C);
    pub const BASE0_LO: FieldOffset = FieldOffset(0x10);
    pub const BASE0_HI: FieldOffset = FieldOffset(0x14);
    pub const BASE1_LO: FieldOffset = FieldOffset(0x18);
    pub const BASE1_HI: FieldOffset = FieldOffset(0x1C);
    pub const BASE2_LO: FieldOffset = FieldOffset(0x20);
    pub const BASE2_HI: FieldOffset = FieldOffset(0x24);
    pub const STRIDE0: FieldOffset = FieldOffset(0x28);
    pub const STRIDE1: FieldOffset = FieldOffset(0x2C);
    pub const STRIDE2: FieldOffset = FieldOffset(0x30);
    pub const FBC_CTRL: FieldOffset = FieldOffset(0x40);
    pub const FBC_OFFSET: FieldOffset = FieldOffset(0x44);
    pub const FBC_SIZE: FieldOffset = FieldOffset(0x48);
    pub const FBC_SPILL_OFFSET: FieldOffset = FieldOffset(0x4C);
    pub const FBC_SPILL_SIZE: FieldOffset = FieldOffset(0x50);
    pub const SCALER_SEL: FieldOffset = FieldOffset(0x60);
    pub const CMD_NEXT_LO: FieldOffset = FieldOffset(0x64);
    pub const CMD_NEXT_HI: FieldOffset = FieldOffset(0x68);
    pub const CMD_NEXT_VPOS: FieldOffset = FieldOffset(0x6C);
    pub const CMD_HEAD_LO: FieldOffset = FieldOffset(0x70);
    pub const CMD_HEAD_HI: FieldOffset = FieldOffset(0x74);
    pub const CMD_HEAD_VPOS: FieldOffset = FieldOffset(0x78);

    /// `(lo, hi)` base address fields of memory plane `plane`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn base(plane: usize) -> (FieldOffset, FieldOffset) {
        let lo = BASE0_LO.next(2 * plane as u32);
        (lo, lo.next(1))
    }

    /// Line stride field of memory plane `plane`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn stride(plane: usize) -> FieldOffset {
        STRIDE0.next(plane as u32)
    }
}

/// Per-channel translation fields.
pub mod mmu {
    use crate::FieldOffset;

    pub const CTRL: FieldOffset = FieldOffset(0x00);
    const TBL0: FieldOffset = FieldOffset(0x10);

    /// The four consecutive registers describing one translation table.
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct TableFields {
        pub base_lo: FieldOffset,
        pub base_hi: FieldOffset,
        pub va: FieldOffset,
        pub size: FieldOffset,
    }

    /// Fields of translation table `index`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table(index: usize) -> TableFields {
        let base_lo = TBL0.next(4 * index as u32);
        TableFields {
            base_lo,
            base_hi: base_lo.next(1),
            va: base_lo.next(2),
            size: base_lo.next(3),
        }
    }
}

const CHAN_BASE: u32 = 0x1000;
const CHAN_STRIDE: u32 = 0x100;
const MMU_BASE: u32 = 0x3000;
const MMU_STRIDE: u32 = 0x80;

pub static TOP: RegisterBlock = RegisterBlock {
    name: "TOP",
    base: 0x0000,
    stride: 0x100,
    instances: 1,
    fields: &[
        ("CHANNEL_EN", top::CHANNEL_EN),
        ("CHANNEL_EN_SET", top::CHANNEL_EN_SET),
        ("CHANNEL_EN_CLR", top::CHANNEL_EN_CLR),
        ("COMMIT", top::COMMIT),
        ("STATUS", top::STATUS),
    ],
};

pub static CHAN: RegisterBlock = RegisterBlock {
    name: "CHAN",
    base: CHAN_BASE,
    stride: CHAN_STRIDE,
    instances: MAX_CHANNELS,
    fields: &[
        ("CTRL", chan::CTRL),
        ("CROP_POS", chan::CROP_POS),
        ("CROP_SIZE", chan::CROP_SIZE),
        ("DST_POS", chan::DST_POS),
        ("BASE0_LO", chan::BASE0_LO),
        ("BASE0_HI", chan::BASE0_HI),
        ("BASE1_LO", chan::BASE1_LO),
        ("BASE1_HI", chan::BASE1_HI),
        ("BASE2_LO", chan::BASE2_LO),
        ("BASE2_HI", chan::BASE2_HI),
        ("STRIDE0", chan::STRIDE0),
        ("STRIDE1", chan::STRIDE1),
        ("STRIDE2", chan::STRIDE2),
        ("FBC_CTRL", chan::FBC_CTRL),
        ("FBC_OFFSET", chan::FBC_OFFSET),
        ("FBC_SIZE", chan::FBC_SIZE),
        ("FBC_SPILL_OFFSET", chan::FBC_SPILL_OFFSET),
        ("FBC_SPILL_SIZE", chan::FBC_SPILL_SIZE),
        ("SCALER_SEL", chan::SCALER_SEL),
        ("CMD_NEXT_LO", chan::CMD_NEXT_LO),
        ("CMD_NEXT_HI", chan::CMD_NEXT_HI),
        ("CMD_NEXT_VPOS", chan::CMD_NEXT_VPOS),
        ("CMD_HEAD_LO", chan::CMD_HEAD_LO),
        ("CMD_HEAD_HI", chan::CMD_HEAD_HI),
        ("CMD_HEAD_VPOS", chan::CMD_HEAD_VPOS),
    ],
};

pub static MMU: RegisterBlock = RegisterBlock {
    name: "MMU",
    base: MMU_BASE,
    stride: MMU_STRIDE,
    instances: MAX_CHANNELS,
    fields: &[
        ("CTRL", mmu::CTRL),
        ("TBL0_BASE_LO", mmu::table(0).base_lo),
        ("TBL0_BASE_HI", mmu::table(0).base_hi),
        ("TBL0_VA", mmu::table(0).va),
        ("TBL0_SIZE", mmu::table(0).size),
        ("TBL1_BASE_LO", mmu::table(1).base_lo),
        ("TBL1_BASE_HI", mmu::table(1).base_hi),
        ("TBL1_VA", mmu::table(1).va),
        ("TBL1_SIZE", mmu::table(1).size),
        ("TBL2_BASE_LO", mmu::table(2).base_lo),
        ("TBL2_BASE_HI", mmu::table(2).base_hi),
        ("TBL2_VA", mmu::table(2).va),
        ("TBL2_SIZE", mmu::table(2).size),
    ],
};

const _: () = {
    assert!(chan::base(MAX_PLANES - 1).1.0 < chan::STRIDE0.0);
    assert!(chan::CMD_NEXT_HI.0 == chan::CMD_NEXT_LO.0 + 4);
    assert!(chan::CMD_NEXT_VPOS.0 == chan::CMD_NEXT_HI.0 + 4);
    assert!(mmu::table(MAX_PLANES - 1).size.0 < MMU_STRIDE);
    assert!(CHAN_BASE + CHAN_STRIDE * MAX_CHANNELS as u32 <= MMU_BASE);
};
