use crate::MAX_POOLS;
use display_info::hw::MAX_CHANNELS;
use display_registers::layout::FbcCtrl;
use display_registers::map::{CHAN, chan};
use display_registers::{RegisterError, RegisterSink};

/// Portion of a window drawn from the next pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FbcSpill {
    pub pool: u8,
    pub start: u32,
    pub size: u32,
}

/// A channel's FBC window for one frame. Offsets and sizes are in FBC units.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FbcWindow {
    /// The pool of the channel's pair.
    pub pool: u8,
    pub start: u32,
    /// Units inside `pool`. May be 0 when the window lives entirely in the spill.
    pub size: u32,
    /// The paired channel also holds a window in `pool`.
    pub shared: bool,
    /// Shortfall borrowed from the next pool.
    pub spill: Option<FbcSpill>,
}

impl FbcWindow {
    #[inline]
    #[must_use]
    pub const fn total_units(&self) -> u32 {
        match self.spill {
            Some(spill) => self.size + spill.size,
            None => self.size,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_split(&self) -> bool {
        self.spill.is_some()
    }
}

/// Per-pool accounting of a plan.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PoolUsage {
    /// Units handed out from this pool, borrowed portions included.
    pub used: u32,
    /// The owning pair or a borrower placed something here.
    pub touched: bool,
    /// Odd channel of another pair this pool lends to.
    pub lent_to: Option<u8>,
}

/// Result of one allocation: every channel's window plus pool accounting.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FbcPlan {
    pools: u8,
    capacity: u32,
    windows: [Option<FbcWindow>; MAX_CHANNELS as usize],
    usage: [PoolUsage; MAX_POOLS],
}

impl FbcPlan {
    /// A plan with no windows.
    #[must_use]
    pub const fn empty(pools: u8, capacity: u32) -> Self {
        Self {
            pools,
            capacity,
            windows: [None; MAX_CHANNELS as usize],
            usage: [PoolUsage {
                used: 0,
                touched: false,
                lent_to: None,
            }; MAX_POOLS],
        }
    }

    #[inline]
    #[must_use]
    pub const fn pools(&self) -> u8 {
        self.pools
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window of `channel`, if it needs FBC memory this frame.
    #[must_use]
    pub fn window(&self, channel: u8) -> Option<&FbcWindow> {
        self.windows.get(usize::from(channel))?.as_ref()
    }

    /// Channels holding a window, in channel order.
    pub fn windows(&self) -> impl Iterator<Item = (u8, &FbcWindow)> {
        (0..self.pools * 2).filter_map(|ch| self.window(ch).map(|w| (ch, w)))
    }

    /// Accounting of `pool`.
    ///
    /// # Panics
    /// If `pool` is not below [`MAX_POOLS`].
    #[must_use]
    pub fn usage(&self, pool: u8) -> PoolUsage {
        self.usage[usize::from(pool)]
    }

    pub(crate) fn touch(&mut self, pool: u8, units: u32) {
        let usage = &mut self.usage[usize::from(pool)];
        usage.used += units;
        usage.touched = true;
        debug_assert!(usage.used <= self.capacity, "pool {pool} overcommitted");
    }

    pub(crate) fn lend(&mut self, pool: u8, borrower: u8) {
        self.usage[usize::from(pool)].lent_to = Some(borrower);
    }

    pub(crate) fn place(&mut self, channel: u8, window: FbcWindow) {
        log::debug!(
            "FBC: channel {channel} -> pool {} [{}, {}){}",
            window.pool,
            window.start,
            window.start + window.size,
            match window.spill {
                Some(_) => " + spill",
                None => "",
            }
        );
        self.windows[usize::from(channel)] = Some(window);
    }

    /// Stage the FBC register programming of `channel`.
    ///
    /// A channel without a window stages nothing.
    ///
    /// # Errors
    /// [`RegisterError::InvalidInstance`] if `channel` has no register block.
    pub fn register_writes<S: RegisterSink + ?Sized>(
        &self,
        channel: u8,
        sink: &mut S,
    ) -> Result<(), RegisterError> {
        let Some(w) = self.window(channel) else {
            return Ok(());
        };
        let ctrl = FbcCtrl::new()
            .with_enable(true)
            .with_split(w.is_split())
            .with_shared(w.shared)
            .with_pool(w.pool)
            .with_spill_pool(w.spill.map_or(0, |s| s.pool));

        sink.stage(CHAN.at(channel, chan::FBC_CTRL)?, ctrl.into_bits());
        sink.stage(CHAN.at(channel, chan::FBC_OFFSET)?, w.start);
        sink.stage(CHAN.at(channel, chan::FBC_SIZE)?, w.size);
        if let Some(spill) = w.spill {
            sink.stage(CHAN.at(channel, chan::FBC_SPILL_OFFSET)?, spill.start);
            sink.stage(CHAN.at(channel, chan::FBC_SPILL_SIZE)?, spill.size);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{FbcPools, FbcRequest};
    use display_registers::map::{CHAN, chan};

    #[test]
    fn split_window_programs_the_spill() {
        let plan = FbcPools::new(2, 1024)
            .allocate(&[FbcRequest::new(0, 600), FbcRequest::new(1, 500)])
            .unwrap();
        let mut writes = Vec::new();
        plan.register_writes(1, &mut writes).unwrap();

        let at = |f| CHAN.at(1, f).unwrap();
        assert_eq!(writes.len(), 5);
        assert_eq!(writes[1], (at(chan::FBC_OFFSET), 600));
        assert_eq!(writes[2], (at(chan::FBC_SIZE), 424));
        assert_eq!(writes[3], (at(chan::FBC_SPILL_OFFSET), 0));
        assert_eq!(writes[4], (at(chan::FBC_SPILL_SIZE), 76));
    }

    #[test]
    fn channel_without_window_stages_nothing() {
        let plan = FbcPools::new(2, 1024)
            .allocate(&[FbcRequest::new(0, 0), FbcRequest::new(2, 8)])
            .unwrap();
        let mut writes = Vec::new();
        plan.register_writes(0, &mut writes).unwrap();
        plan.register_writes(1, &mut writes).unwrap();
        assert!(writes.is_empty());
        plan.register_writes(2, &mut writes).unwrap();
        assert_eq!(writes.len(), 3);
    }
}
