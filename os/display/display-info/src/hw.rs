//! # Hardware Constants

/// Granule of the on-chip FBC memory; pool sizes and offsets are counted in these.
pub const FBC_UNIT_BYTES: u32 = 32;

/// Maximum number of pixel-fetch channels the enable bitmask can address.
pub const MAX_CHANNELS: u8 = 16;

/// Maximum number of memory planes per surface (Y/U/V).
pub const MAX_PLANES: usize = 3;

/// Number of 32-bit value slots in a command row.
pub const CMD_ROW_SLOTS: usize = 3;

/// Size in bytes of one serialized command row.
///
/// Layout: 64-bit control word, three 32-bit value slots, 32-bit reserved word.
pub const CMD_ROW_BYTES: usize = 24;

/// Size in bytes of the serialized command-list header.
///
/// Layout: 64-bit header word followed by 64 reserved bits.
pub const CMD_HEADER_BYTES: usize = 16;

/// Fixed trailer rows appended to every command list:
/// scaler select, next-list pointer, terminal row.
pub const CMD_TRAILER_ROWS: usize = 3;

/// Width of the device address the sequencer can follow to the next list.
pub const CMDLIST_ADDR_BITS: u32 = 34;

/// Required alignment of a command-list buffer in device memory.
pub const CMDLIST_ALIGN: u64 = 64;

/// Byte-enable bits per value slot in the row strobe.
pub const STROBE_BITS_PER_SLOT: u32 = 4;

/// Page shift of a translation table entry's frame number.
pub const MMU_PFN_SHIFT: u32 = 12;

/// Smallest page the translation table can address.
pub const MMU_PAGE_BYTES: u64 = 1 << MMU_PFN_SHIFT;

const _: () = {
    assert!(FBC_UNIT_BYTES.is_power_of_two());
    assert!(CMD_ROW_BYTES == 8 + CMD_ROW_SLOTS * 4 + 4);
    assert!(STROBE_BITS_PER_SLOT as usize * CMD_ROW_SLOTS == 12);
    assert!(CMDLIST_ALIGN.is_power_of_two());
    assert!(MAX_CHANNELS as u32 <= u32::BITS);
};
