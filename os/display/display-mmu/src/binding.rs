use display_addresses::DeviceAddress;
use display_info::hw::MAX_PLANES;
use display_registers::layout::MmuCtrl;
use display_registers::map::{CHAN, MMU, chan, mmu};
use display_registers::{RegisterError, RegisterSink};

/// One programmed translation table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TableWindow {
    /// Device address of the first entry.
    pub base: DeviceAddress,
    /// Start of the virtual window the table translates.
    pub va: u32,
    /// Bytes of virtual window covered by real entries.
    pub size: u32,
    /// Entries in the table, padding included.
    pub entries: usize,
}

/// Result of binding one surface to a channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Binding {
    channel: u8,
    planes: u8,
    bases: [DeviceAddress; MAX_PLANES],
    tables: [Option<TableWindow>; MAX_PLANES],
    alias: bool,
}

impl Binding {
    pub(crate) const fn new(channel: u8, planes: u8) -> Self {
        Self {
            channel,
            planes,
            bases: [DeviceAddress::zero(); MAX_PLANES],
            tables: [None; MAX_PLANES],
            alias: false,
        }
    }

    pub(crate) fn set_base(&mut self, plane: usize, base: DeviceAddress) {
        self.bases[plane] = base;
    }

    pub(crate) fn set_table(&mut self, slot: usize, table: TableWindow) {
        self.tables[slot] = Some(table);
    }

    pub(crate) fn alias_first_table(&mut self) {
        self.tables[1] = self.tables[0];
        self.alias = true;
    }

    #[inline]
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// The channel fetches through translation tables.
    #[inline]
    #[must_use]
    pub const fn is_translated(&self) -> bool {
        self.tables[0].is_some()
    }

    /// Table slot 1 aliases slot 0.
    #[inline]
    #[must_use]
    pub const fn is_aliased(&self) -> bool {
        self.alias
    }

    /// Fetch address of `plane`: virtual when translated, physical otherwise.
    #[must_use]
    pub fn plane_base(&self, plane: usize) -> Option<DeviceAddress> {
        (plane < usize::from(self.planes)).then(|| self.bases[plane])
    }

    #[must_use]
    pub fn table(&self, slot: usize) -> Option<&TableWindow> {
        self.tables.get(slot)?.as_ref()
    }

    /// Programmed table slots, aliases included.
    pub fn tables(&self) -> impl Iterator<Item = &TableWindow> {
        self.tables.iter().flatten()
    }

    /// Stage the translation and plane base programming of the channel.
    ///
    /// # Errors
    /// [`RegisterError::InvalidInstance`] if the channel has no register block.
    pub fn register_writes<S: RegisterSink + ?Sized>(&self, sink: &mut S) -> Result<(), RegisterError> {
        let ch = self.channel;
        let slots = self.tables().count();
        let ctrl = MmuCtrl::new()
            .with_enable(slots > 0)
            .with_tables(u8::try_from(slots).unwrap_or(0))
            .with_alias(self.alias);
        sink.stage(MMU.at(ch, mmu::CTRL)?, ctrl.into_bits());

        for (i, table) in self.tables().enumerate() {
            let f = mmu::table(i);
            sink.stage(MMU.at(ch, f.base_lo)?, table.base.lo());
            sink.stage(MMU.at(ch, f.base_hi)?, table.base.hi());
            sink.stage(MMU.at(ch, f.va)?, table.va);
            sink.stage(MMU.at(ch, f.size)?, table.size);
        }

        for plane in 0..usize::from(self.planes) {
            let (lo, hi) = chan::base(plane);
            sink.stage(CHAN.at(ch, lo)?, self.bases[plane].lo());
            sink.stage(CHAN.at(ch, hi)?, self.bases[plane].hi());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_binding_disables_translation() {
        let mut b = Binding::new(2, 2);
        b.set_base(0, DeviceAddress::new(0x1_2000_0000));
        b.set_base(1, DeviceAddress::new(0x1_2000_8000));
        let mut writes = Vec::new();
        b.register_writes(&mut writes).unwrap();

        assert_eq!(writes[0], (MMU.at(2, mmu::CTRL).unwrap(), 0));
        assert_eq!(writes.len(), 1 + 4);
        assert_eq!(writes[3], (CHAN.at(2, chan::BASE1_LO).unwrap(), 0x2000_8000));
        assert_eq!(writes[4], (CHAN.at(2, chan::BASE1_HI).unwrap(), 1));
        assert_eq!(b.plane_base(2), None);
    }
}
