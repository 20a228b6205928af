//! Wire format of command rows and the list header.

use bitfield_struct::bitfield;
use display_addresses::DeviceAddress;
use display_info::hw::{CMD_HEADER_BYTES, CMD_ROW_BYTES, CMD_ROW_SLOTS, STROBE_BITS_PER_SLOT};
use display_registers::RegisterRef;

/// End tag of the last row of a list.
pub const END_OF_LIST: u8 = 0b01;

/// Strobe nibble of a fully written slot.
const SLOT_STROBE: u16 = (1 << STROBE_BITS_PER_SLOT) - 1;

/// Control word of a command row.
///
/// | Bits  | Field    | Meaning |
/// |-------|----------|---------|
/// | 0–31  | `addr`   | Register word index of slot 0 |
/// | 32–43 | `strobe` | Byte enables, one nibble per slot |
/// | 44–45 | `end`    | [`END_OF_LIST`] on the terminal row |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct RowControl {
    pub addr: u32,
    #[bits(12)]
    pub strobe: u16,
    #[bits(2)]
    pub end: u8,
    #[bits(18)]
    __: u32,
}

/// Header word of a command list.
///
/// | Bits  | Field      | Meaning |
/// |-------|------------|---------|
/// | 0–33  | `next`     | Device address of the next list in the chain |
/// | 34–49 | `rows`     | Rows following the header |
/// | 50    | `terminal` | No list follows |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct ListHeader {
    #[bits(34)]
    pub next: u64,
    #[bits(16)]
    pub rows: u16,
    pub terminal: bool,
    #[bits(13)]
    __: u16,
}

impl ListHeader {
    pub(crate) fn encode(self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.into_bits().to_le_bytes());
        out[8..CMD_HEADER_BYTES].fill(0);
    }

    pub(crate) fn decode(bytes: &[u8]) -> Self {
        Self::from_bits(le_u64(&bytes[..8]))
    }

    /// The next list, unless terminal.
    #[must_use]
    pub fn next_list(self) -> Option<DeviceAddress> {
        (!self.terminal()).then(|| DeviceAddress::new(self.next()))
    }
}

/// One command row: up to three writes to consecutive registers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CmdRow {
    pub control: RowControl,
    pub values: [u32; CMD_ROW_SLOTS],
}

impl CmdRow {
    /// A row writing `values` to consecutive registers starting at `first`.
    ///
    /// # Panics
    /// If more than [`CMD_ROW_SLOTS`] values are given.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(first: RegisterRef, values: &[u32]) -> Self {
        assert!(values.len() <= CMD_ROW_SLOTS, "a row holds at most three values");
        let mut row = Self {
            control: RowControl::new().with_addr(first.word_index()),
            values: [0; CMD_ROW_SLOTS],
        };
        row.values[..values.len()].copy_from_slice(values);
        let strobe = (0..values.len()).fold(0, |s, slot| s | SLOT_STROBE << (slot as u32 * STROBE_BITS_PER_SLOT));
        row.control.set_strobe(strobe);
        row
    }

    /// Mark this row as the last of its list.
    #[must_use]
    pub const fn terminal(mut self) -> Self {
        self.control = self.control.with_end(END_OF_LIST);
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.control.end() == END_OF_LIST
    }

    /// Register targeted by slot 0.
    #[inline]
    #[must_use]
    pub const fn first_register(&self) -> RegisterRef {
        RegisterRef::from_word_index(self.control.addr())
    }

    /// Whether `slot` carries a value.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn slot_valid(&self, slot: usize) -> bool {
        (self.control.strobe() >> (slot as u32 * STROBE_BITS_PER_SLOT)) & SLOT_STROBE != 0
    }

    /// The writes this row performs, in slot order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn writes(&self) -> impl Iterator<Item = (RegisterRef, u32)> + '_ {
        let base = self.control.addr();
        (0..CMD_ROW_SLOTS)
            .filter(|&slot| self.slot_valid(slot))
            .map(move |slot| (RegisterRef::from_word_index(base + slot as u32), self.values[slot]))
    }

    pub(crate) fn encode(&self, out: &mut [u8]) {
        out[..8].copy_from_slice(&self.control.into_bits().to_le_bytes());
        for (chunk, v) in out[8..8 + CMD_ROW_SLOTS * 4].chunks_exact_mut(4).zip(self.values) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        out[8 + CMD_ROW_SLOTS * 4..CMD_ROW_BYTES].fill(0);
    }

    /// Parse one row; `None` if a strobe nibble is only partially set.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn decode(bytes: &[u8]) -> Option<Self> {
        let control = RowControl::from_bits(le_u64(&bytes[..8]));
        let mut values = [0; CMD_ROW_SLOTS];
        for (v, chunk) in values.iter_mut().zip(bytes[8..].chunks_exact(4)) {
            *v = le_u32(chunk);
        }
        let row = Self { control, values };
        let nibbles_ok = (0..CMD_ROW_SLOTS).all(|slot| {
            let nibble = (control.strobe() >> (slot as u32 * STROBE_BITS_PER_SLOT)) & SLOT_STROBE;
            nibble == 0 || nibble == SLOT_STROBE
        });
        nibbles_ok.then_some(row)
    }
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut word = [0; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strobe_marks_valid_slots() {
        let row = CmdRow::new(RegisterRef::from_offset(0x1010), &[1, 2]);
        assert_eq!(row.control.strobe(), 0x0FF);
        assert_eq!(row.control.addr(), 0x1010 / 4);
        assert!(row.slot_valid(1) && !row.slot_valid(2));
        let writes: Vec<_> = row.writes().collect();
        assert_eq!(
            writes,
            [
                (RegisterRef::from_offset(0x1010), 1),
                (RegisterRef::from_offset(0x1014), 2)
            ]
        );
    }

    #[test]
    fn row_bytes_are_little_endian() {
        let row = CmdRow::new(RegisterRef::from_offset(0x4), &[0xAABB_CCDD, 0, 7]).terminal();
        let mut out = [0xFFu8; CMD_ROW_BYTES];
        row.encode(&mut out);
        assert_eq!(&out[..8], &(1u64 | 0xFFF << 32 | 1 << 44).to_le_bytes());
        assert_eq!(&out[8..12], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&out[20..24], &[0, 0, 0, 0]);
        assert_eq!(CmdRow::decode(&out), Some(row));
    }

    #[test]
    fn partial_strobe_is_rejected() {
        let mut out = [0u8; CMD_ROW_BYTES];
        CmdRow::new(RegisterRef::from_offset(0), &[1]).encode(&mut out);
        out[4] = 0x03;
        assert_eq!(CmdRow::decode(&out), None);
    }

    #[test]
    fn header_next_pointer_is_34_bits() {
        let header = ListHeader::new()
            .with_next(0x3_FFFF_FFC0)
            .with_rows(9)
            .with_terminal(false);
        let mut out = [0xFFu8; CMD_HEADER_BYTES];
        header.encode(&mut out);
        let back = ListHeader::decode(&out);
        assert_eq!(back, header);
        assert_eq!(back.next_list(), Some(DeviceAddress::new(0x3_FFFF_FFC0)));
        assert_eq!(&out[8..], &[0; 8]);
    }
}
