use crate::CmdListError;
use crate::row::{CmdRow, ListHeader};
use alloc::vec::Vec;
use display_addresses::DeviceAddress;
use display_info::hw::{CMD_HEADER_BYTES, CMD_ROW_BYTES, CMD_ROW_SLOTS, CMD_TRAILER_ROWS, MAX_CHANNELS};
use display_registers::layout::ScalerSel;
use display_registers::map::{CHAN, TOP, chan, top};
use display_registers::{RegisterRef, RegisterSink};

/// Successor of a list in its channel chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NextList {
    pub addr: DeviceAddress,
    /// First line the successor programs.
    pub vpos: u16,
}

/// A packed command list: header plus rows, the last three being the trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList {
    header: ListHeader,
    rows: Vec<CmdRow>,
}

impl CommandList {
    #[inline]
    #[must_use]
    pub const fn header(&self) -> ListHeader {
        self.header
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[CmdRow] {
        &self.rows
    }

    /// Rows produced from accumulated writes, without the trailer.
    #[must_use]
    pub fn body(&self) -> &[CmdRow] {
        &self.rows[..self.rows.len().saturating_sub(CMD_TRAILER_ROWS)]
    }

    /// Serialized size in bytes.
    #[inline]
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        CMD_HEADER_BYTES + self.rows.len() * CMD_ROW_BYTES
    }

    /// Point this list at its successor, or mark it last in the chain.
    ///
    /// Both the header and the next-list trailer row are rewritten.
    pub fn set_next(&mut self, next: Option<NextList>) {
        let (addr, vpos) = next.map_or((DeviceAddress::zero(), 0), |n| (n.addr, n.vpos));
        self.header = self
            .header
            .with_next(addr.as_u64())
            .with_terminal(next.is_none());
        let at = self.rows.len() - 2;
        self.rows[at].values = [addr.lo(), addr.hi(), u32::from(vpos)];
    }

    /// Every register write of the list in row order, trailer included.
    pub fn writes(&self) -> impl Iterator<Item = (RegisterRef, u32)> + '_ {
        self.rows.iter().flat_map(CmdRow::writes)
    }

    /// Serialize into `out`, which must hold [`encoded_len`](Self::encoded_len) bytes.
    /// Bytes past the list are left as they are.
    ///
    /// # Errors
    /// [`CmdListError::Truncated`] if `out` is too short.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<(), CmdListError> {
        let needed = self.encoded_len();
        if out.len() < needed {
            return Err(CmdListError::Truncated {
                len: out.len(),
                needed,
            });
        }
        self.header.encode(&mut out[..CMD_HEADER_BYTES]);
        for (row, chunk) in self
            .rows
            .iter()
            .zip(out[CMD_HEADER_BYTES..needed].chunks_exact_mut(CMD_ROW_BYTES))
        {
            row.encode(chunk);
        }
        Ok(())
    }

    /// Parse a serialized list.
    ///
    /// # Errors
    /// [`CmdListError::Truncated`] if `bytes` ends before the rows the header
    /// announces, [`CmdListError::MalformedRow`] for a row with a partial
    /// strobe or an end tag before the last row.
    pub fn decode(bytes: &[u8]) -> Result<Self, CmdListError> {
        if bytes.len() < CMD_HEADER_BYTES {
            return Err(CmdListError::Truncated {
                len: bytes.len(),
                needed: CMD_HEADER_BYTES,
            });
        }
        let header = ListHeader::decode(bytes);
        let count = usize::from(header.rows());
        let needed = CMD_HEADER_BYTES + count * CMD_ROW_BYTES;
        if bytes.len() < needed {
            return Err(CmdListError::Truncated {
                len: bytes.len(),
                needed,
            });
        }

        let mut rows = Vec::with_capacity(count);
        for (i, chunk) in bytes[CMD_HEADER_BYTES..needed]
            .chunks_exact(CMD_ROW_BYTES)
            .enumerate()
        {
            let row = CmdRow::decode(chunk).ok_or(CmdListError::MalformedRow(i))?;
            if row.is_terminal() != (i + 1 == count) {
                return Err(CmdListError::MalformedRow(i));
            }
            rows.push(row);
        }
        Ok(Self { header, rows })
    }
}

/// Fixed rows closing every list.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Trailer {
    /// Channel the list feeds; its enable bit is set by the terminal row.
    pub channel: u8,
    /// Scaler routed to the channel, if any.
    pub scaler: Option<u8>,
}

/// Accumulates register writes for one plane and packs them into a [`CommandList`].
#[derive(Debug, Default)]
pub struct CmdListBuilder {
    writes: Vec<(RegisterRef, u32)>,
}

impl CmdListBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { writes: Vec::new() }
    }

    pub fn push(&mut self, reg: RegisterRef, value: u32) {
        self.writes.push((reg, value));
    }

    /// Writes accumulated so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Drop accumulated writes.
    pub fn clear(&mut self) {
        self.writes.clear();
    }

    /// Pack the accumulated writes into a terminal list of at most `max_rows`
    /// rows, trailer included.
    ///
    /// Writes are ordered by register; a register written more than once
    /// keeps its last value. Runs of up to three consecutive registers share
    /// a row. The accumulator is empty afterwards, whether or not packing
    /// succeeded.
    ///
    /// # Errors
    /// [`CmdListError::Overflow`] if the rows exceed `max_rows`,
    /// [`CmdListError::InvalidChannel`] / [`CmdListError::Register`] if the
    /// trailer names a channel without registers.
    pub fn build(&mut self, trailer: Trailer, max_rows: usize) -> Result<CommandList, CmdListError> {
        let mut writes = core::mem::take(&mut self.writes);
        if trailer.channel >= MAX_CHANNELS {
            return Err(CmdListError::InvalidChannel(trailer.channel));
        }

        writes.sort_by_key(|&(reg, _)| reg);
        writes.dedup_by(|later, earlier| {
            let same = later.0 == earlier.0;
            if same {
                earlier.1 = later.1;
            }
            same
        });

        let mut rows = Vec::with_capacity(writes.len().div_ceil(CMD_ROW_SLOTS) + CMD_TRAILER_ROWS);
        let mut run = writes.as_slice();
        while let Some(&(first, _)) = run.first() {
            let mut len = 1;
            while len < CMD_ROW_SLOTS && len < run.len() && run[len].0 == run[len - 1].0.next() {
                len += 1;
            }
            let mut values = [0; CMD_ROW_SLOTS];
            for (v, &(_, w)) in values.iter_mut().zip(&run[..len]) {
                *v = w;
            }
            rows.push(CmdRow::new(first, &values[..len]));
            run = &run[len..];
        }

        let total = rows.len() + CMD_TRAILER_ROWS;
        if total > max_rows || total > usize::from(u16::MAX) {
            log::warn!(
                "command list for channel {} needs {total} rows, buffer holds {max_rows}",
                trailer.channel
            );
            return Err(CmdListError::Overflow {
                rows: total,
                max: max_rows,
            });
        }

        let ch = trailer.channel;
        let scaler = ScalerSel::new()
            .with_enable(trailer.scaler.is_some())
            .with_scaler(trailer.scaler.unwrap_or(0));
        rows.push(CmdRow::new(CHAN.at(ch, chan::SCALER_SEL)?, &[scaler.into_bits()]));
        rows.push(CmdRow::new(CHAN.at(ch, chan::CMD_NEXT_LO)?, &[0, 0, 0]));
        rows.push(CmdRow::new(TOP.at(0, top::CHANNEL_EN_SET)?, &[1 << ch]).terminal());

        let header = ListHeader::new()
            .with_rows(u16::try_from(rows.len()).unwrap_or(u16::MAX))
            .with_terminal(true);
        log::trace!("command list for channel {ch}: {} rows from {} writes", rows.len(), writes.len());
        Ok(CommandList { header, rows })
    }
}

impl RegisterSink for CmdListBuilder {
    #[inline]
    fn stage(&mut self, reg: RegisterRef, value: u32) {
        self.push(reg, value);
    }
}
