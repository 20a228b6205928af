use crate::CmdListError;
use crate::list::{CommandList, NextList};
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use display_addresses::DeviceAddress;
use display_info::hw::{CMDLIST_ADDR_BITS, CMDLIST_ALIGN, MAX_CHANNELS};
use display_registers::map::{CHAN, TOP, chan, top};
use display_registers::{FieldOffset, RegisterBlock, RegisterIo};

/// Set of channels, one bit per channel.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ChannelMask(u32);

impl ChannelMask {
    pub const EMPTY: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, channel: u8) -> bool {
        channel < 32 && self.0 & (1 << channel) != 0
    }

    #[inline]
    pub const fn insert(&mut self, channel: u8) {
        self.0 |= 1 << channel;
    }

    /// Channels in `self` but not in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Channels in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..MAX_CHANNELS).filter(move |&ch| self.contains(ch))
    }
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelMask({:#06b})", self.0)
    }
}

/// Index of a command list in its owner's arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListId(pub u16);

/// A placed command list as seen by the scheduler.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ListRef {
    pub id: ListId,
    pub channel: u8,
    /// First line the list programs.
    pub vpos: u16,
    /// Device address of the list buffer.
    pub addr: DeviceAddress,
}

impl ListRef {
    /// # Errors
    /// [`CmdListError::InvalidChannel`] if `channel` does not exist,
    /// [`CmdListError::BadListAddress`] if the sequencer cannot follow `addr`.
    pub const fn new(id: ListId, channel: u8, vpos: u16, addr: DeviceAddress) -> Result<Self, CmdListError> {
        if channel >= MAX_CHANNELS {
            return Err(CmdListError::InvalidChannel(channel));
        }
        if addr.is_zero() || !addr.fits_bits(CMDLIST_ADDR_BITS) || !addr.is_aligned(CMDLIST_ALIGN) {
            return Err(CmdListError::BadListAddress(addr));
        }
        Ok(Self {
            id,
            channel,
            vpos,
            addr,
        })
    }
}

/// Owner of the lists the scheduler links.
pub trait ListArena {
    /// Point list `id` at its successor, or mark it last.
    fn set_next(&mut self, id: ListId, next: Option<NextList>);
}

impl ListArena for [CommandList] {
    fn set_next(&mut self, id: ListId, next: Option<NextList>) {
        if let Some(list) = self.get_mut(usize::from(id.0)) {
            list.set_next(next);
        }
    }
}

impl<A: ListArena + ?Sized> ListArena for &mut A {
    fn set_next(&mut self, id: ListId, next: Option<NextList>) {
        (**self).set_next(id, next);
    }
}

/// Lists are being collected.
#[derive(Debug)]
pub enum Idle {}
/// Chains are linked; nothing has been written to hardware.
#[derive(Debug)]
pub enum Linked {}
/// The frame has been handed to hardware.
#[derive(Debug)]
pub enum Committed {}

/// Per-channel chains of command lists for one frame.
pub struct ChannelGroups<S> {
    chains: [Vec<ListRef>; MAX_CHANNELS as usize],
    report: CommitReport,
    _state: PhantomData<S>,
}

impl<S> fmt::Debug for ChannelGroups<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelGroups")
            .field("active", &self.active())
            .field("lists", &self.list_count())
            .finish_non_exhaustive()
    }
}

impl<S> ChannelGroups<S> {
    /// Channels with at least one list.
    #[must_use]
    pub fn active(&self) -> ChannelMask {
        let mut mask = ChannelMask::EMPTY;
        for (ch, chain) in (0..MAX_CHANNELS).zip(&self.chains) {
            if !chain.is_empty() {
                mask.insert(ch);
            }
        }
        mask
    }

    /// Lists of `channel` in execution order.
    #[must_use]
    pub fn chain(&self, channel: u8) -> &[ListRef] {
        self.chains.get(usize::from(channel)).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn list_count(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    fn into_state<T>(self) -> ChannelGroups<T> {
        ChannelGroups {
            chains: self.chains,
            report: self.report,
            _state: PhantomData,
        }
    }
}

impl Default for ChannelGroups<Idle> {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelGroups<Idle> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chains: core::array::from_fn(|_| Vec::new()),
            report: CommitReport::default(),
            _state: PhantomData,
        }
    }

    /// Add a list to its channel's chain, ordered by `vpos`. Lists with
    /// equal `vpos` keep insertion order.
    pub fn insert(&mut self, list: ListRef) {
        let chain = &mut self.chains[usize::from(list.channel)];
        let at = chain.partition_point(|l| l.vpos <= list.vpos);
        chain.insert(at, list);
    }

    /// Point every list at its successor; the last list of each chain
    /// becomes terminal.
    pub fn link<A: ListArena + ?Sized>(self, arena: &mut A) -> ChannelGroups<Linked> {
        for (ch, chain) in (0..MAX_CHANNELS).zip(&self.chains) {
            for (i, list) in chain.iter().enumerate() {
                let next = chain.get(i + 1).map(|n| NextList {
                    addr: n.addr,
                    vpos: n.vpos,
                });
                arena.set_next(list.id, next);
            }
            if !chain.is_empty() {
                log::debug!("channel {ch}: {} command list(s) linked", chain.len());
            }
        }
        self.into_state()
    }
}

impl ChannelGroups<Linked> {
    /// Hand the frame to hardware.
    ///
    /// Channels in `previous` that carry no list this frame are disabled
    /// first. Each active channel then gets its chain head and is enabled,
    /// and the commit latch is written last.
    pub fn commit<IO: RegisterIo + ?Sized>(self, io: &mut IO, previous: ChannelMask) -> ChannelGroups<Committed> {
        let active = self.active();
        let stale = previous.difference(active);

        for ch in stale.iter() {
            write(io, &TOP, 0, top::CHANNEL_EN_CLR, 1 << ch);
            write(io, &CHAN, ch, chan::CTRL, 0);
            write(io, &CHAN, ch, chan::CMD_HEAD_LO, 0);
            write(io, &CHAN, ch, chan::CMD_HEAD_HI, 0);
            write(io, &CHAN, ch, chan::CMD_HEAD_VPOS, 0);
        }

        for ch in active.iter() {
            let Some(head) = self.chain(ch).first() else {
                continue;
            };
            write(io, &CHAN, ch, chan::CMD_HEAD_LO, head.addr.lo());
            write(io, &CHAN, ch, chan::CMD_HEAD_HI, head.addr.hi());
            write(io, &CHAN, ch, chan::CMD_HEAD_VPOS, u32::from(head.vpos));
            write(io, &TOP, 0, top::CHANNEL_EN_SET, 1 << ch);
        }
        write(io, &TOP, 0, top::COMMIT, 1);

        log::info!(
            "commit: {} list(s) on {:?}, disabled {:?}",
            self.list_count(),
            active,
            stale
        );
        let mut committed = self.into_state::<Committed>();
        committed.report = CommitReport {
            enabled: active,
            disabled: stale,
            lists: committed.list_count(),
        };
        committed
    }
}

impl ChannelGroups<Committed> {
    #[must_use]
    pub const fn report(&self) -> CommitReport {
        self.report
    }
}

/// What a commit changed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CommitReport {
    /// Channels running this frame.
    pub enabled: ChannelMask,
    /// Channels shut down because they went idle.
    pub disabled: ChannelMask,
    pub lists: usize,
}

fn write<IO: RegisterIo + ?Sized>(io: &mut IO, block: &RegisterBlock, instance: u8, field: FieldOffset, value: u32) {
    match block.at(instance, field) {
        Ok(reg) => io.write(reg, value),
        Err(e) => log::error!("commit: {e}"),
    }
}
