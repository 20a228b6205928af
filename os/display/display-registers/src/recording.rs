use crate::map::{CHAN, MMU, TOP};
use crate::{RegisterIo, RegisterRef};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// Host-side [`RegisterIo`] that keeps an ordered log of every write.
///
/// Reads return the last value written to the register (0 if never written),
/// which is enough to model the plain read/write registers the planner
/// touches. Write-1-to-set/clear registers are logged verbatim.
#[derive(Debug, Default)]
pub struct RecordingIo {
    writes: Vec<(RegisterRef, u32)>,
    shadow: BTreeMap<RegisterRef, u32>,
}

impl RecordingIo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes in issue order.
    #[must_use]
    pub fn writes(&self) -> &[(RegisterRef, u32)] {
        &self.writes
    }

    /// Position of the first write to `reg`, if any.
    #[must_use]
    pub fn first_write_to(&self, reg: RegisterRef) -> Option<usize> {
        self.writes.iter().position(|&(r, _)| r == reg)
    }

    /// Last value written to `reg`.
    #[must_use]
    pub fn last_value(&self, reg: RegisterRef) -> Option<u32> {
        self.shadow.get(&reg).copied()
    }

    /// Forget the write log but keep the shadow register file.
    pub fn clear_log(&mut self) {
        self.writes.clear();
    }

    /// Human-readable name of `reg` for assertion messages.
    #[must_use]
    pub fn describe(reg: RegisterRef) -> Option<(&'static str, u8, &'static str)> {
        [&TOP, &CHAN, &MMU]
            .into_iter()
            .find_map(|b| b.describe(reg).map(|(i, f)| (b.name, i, f)))
    }
}

impl RegisterIo for RecordingIo {
    fn read(&mut self, reg: RegisterRef) -> u32 {
        self.shadow.get(&reg).copied().unwrap_or(0)
    }

    fn write(&mut self, reg: RegisterRef, value: u32) {
        self.writes.push((reg, value));
        self.shadow.insert(reg, value);
    }
}
