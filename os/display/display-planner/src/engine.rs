use crate::caps::{CapsTable, ChannelCaps, reference_caps};
use crate::error::{ErrorClass, PlanError};
use crate::frame::{FramePlan, PreparedFrame};
use crate::plane::{PlaneArena, PlaneId};
use crate::request::{FrameRequest, PlaneRequest};
use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;
use display_cmdlist::{ChannelGroups, ChannelMask, CmdListBuilder, CommandList, CommitReport, Idle, ListRef, Trailer};
use display_dma::{DmaAllocator, DmaMemory};
use display_fbc::{FbcPlan, FbcPools, FbcRequest};
use display_info::hw::{CMDLIST_ALIGN, MAX_CHANNELS};
use display_info::{EngineConfig, PlaneErrorPolicy};
use display_mmu::{MmuBinder, ScatterList};
use display_registers::RegisterIo;

/// Planner state of one display engine instance.
///
/// Owns the device-memory allocator, every plane's buffers, and what the
/// hardware was last told: the enabled channels and the FBC split.
pub struct DisplayEngine<A: DmaAllocator> {
    config: EngineConfig,
    caps: CapsTable,
    pools: FbcPools,
    binder: MmuBinder,
    dma: A,
    planes: PlaneArena<A::Buffer>,
    in_use: ChannelMask,
    on_screen: Vec<PlaneId>,
    committed_fbc: Option<FbcPlan>,
    /// Bumped by every `prepare`; only the latest prepared frame commits.
    generation: u64,
}

impl<A: DmaAllocator> fmt::Debug for DisplayEngine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("channels", &self.config.channels)
            .field("planes", &self.planes.len())
            .field("in_use", &self.in_use)
            .finish_non_exhaustive()
    }
}

impl<A: DmaAllocator> DisplayEngine<A> {
    /// An engine with the reference capability table.
    ///
    /// # Errors
    /// [`PlanError::Config`] if `config` is inconsistent.
    pub fn new(config: EngineConfig, dma: A) -> Result<Self, PlanError> {
        config.validate()?;
        log::info!(
            "display engine: {} channels, {} FBC pools of {} units, {} byte command lists",
            config.channels,
            config.fbc_pools,
            config.fbc_pool_units,
            config.cmdlist_bytes
        );
        Ok(Self {
            config,
            caps: reference_caps(),
            pools: FbcPools::from_config(&config),
            binder: MmuBinder::from_config(&config),
            dma,
            planes: PlaneArena::default(),
            in_use: ChannelMask::EMPTY,
            on_screen: Vec::new(),
            committed_fbc: None,
            generation: 0,
        })
    }

    /// Replace the capability table.
    #[must_use]
    pub fn with_caps(mut self, caps: CapsTable) -> Self {
        self.caps = caps;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn dma(&self) -> &A {
        &self.dma
    }

    /// Channels enabled by the last commit.
    #[must_use]
    pub const fn channels_in_use(&self) -> ChannelMask {
        self.in_use
    }

    /// FBC split handed to hardware by the last commit.
    #[must_use]
    pub const fn committed_fbc(&self) -> Option<&FbcPlan> {
        self.committed_fbc.as_ref()
    }

    /// The list of `plane` handed to hardware by the last commit, links
    /// included.
    #[must_use]
    pub fn command_list(&self, plane: PlaneId) -> Option<&CommandList> {
        self.planes.get(plane)?.list.as_ref()
    }

    /// Translation tables of `plane` as handed to hardware by the last
    /// commit. `None` before the first commit and on the contiguous path.
    #[must_use]
    pub fn committed_tables(&self, plane: PlaneId) -> Option<&[u8]> {
        self.planes.get(plane)?.front.tables.get().map(DmaMemory::as_bytes)
    }

    /// The list prepared for `plane` and not yet committed.
    #[must_use]
    pub fn staged_list(&self, plane: PlaneId) -> Option<&CommandList> {
        self.planes.get(plane)?.staged.as_ref()
    }

    /// Allocate state for a new plane. Buffers are acquired on first use.
    ///
    /// # Errors
    /// [`PlanError::PlaneIdsExhausted`] when every id is in use.
    pub fn create_plane(&mut self) -> Result<PlaneId, PlanError> {
        let id = self.planes.create().ok_or(PlanError::PlaneIdsExhausted)?;
        log::debug!("{id} created");
        Ok(id)
    }

    /// Release `plane` and its device buffers.
    ///
    /// # Errors
    /// [`PlanError::UnknownPlane`] if it does not exist, and
    /// [`PlanError::PlaneOnScreen`] while hardware may still fetch its
    /// command list; commit a frame without it first.
    ///
    /// A frame prepared before the plane was destroyed can no longer be
    /// committed.
    pub fn destroy_plane(&mut self, plane: PlaneId) -> Result<(), PlanError> {
        if self.on_screen.contains(&plane) {
            return Err(PlanError::PlaneOnScreen(plane));
        }
        if !self.planes.destroy(plane) {
            return Err(PlanError::UnknownPlane(plane));
        }
        self.generation = self.generation.wrapping_add(1);
        log::debug!("{plane} destroyed");
        Ok(())
    }

    #[must_use]
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Check a frame against the hardware without touching memory or
    /// registers, and split the FBC pools between its channels.
    ///
    /// # Errors
    /// Capacity errors always fail; other per-plane errors fail unless the
    /// configured policy drops the plane.
    pub fn validate<S: ScatterList + ?Sized>(&self, frame: &FrameRequest<'_, S>) -> Result<FramePlan, PlanError> {
        let policy = self.config.plane_error_policy;
        let mut accepted = Vec::new();
        let mut dropped = Vec::new();
        let mut seen = BTreeSet::new();
        for (i, req) in frame.planes().iter().enumerate() {
            let checked = if seen.insert(req.plane) {
                self.check_plane(req)
            } else {
                Err(PlanError::DuplicatePlane(req.plane))
            };
            match checked {
                Ok(()) => accepted.push(i),
                Err(e) => absorb(policy, req.plane, e, &mut dropped)?,
            }
        }

        // Planes sharing a channel run one after another; the largest wins.
        let mut units = [0u32; MAX_CHANNELS as usize];
        let mut channels = ChannelMask::EMPTY;
        for req in accepted.iter().map(|&i| &frame.planes()[i]) {
            let need = &mut units[usize::from(req.channel)];
            *need = (*need).max(req.fbc_request().units);
            channels.insert(req.channel);
        }
        let requests: Vec<_> = channels
            .iter()
            .map(|ch| FbcRequest::new(ch, units[usize::from(ch)]))
            .collect();
        let fbc = self.pools.allocate(&requests).inspect_err(|e| {
            log::warn!("frame rejected: {e}");
        })?;

        Ok(FramePlan {
            fbc,
            accepted,
            dropped,
            request_len: frame.planes().len(),
        })
    }

    fn check_plane<S: ?Sized>(&self, req: &PlaneRequest<'_, S>) -> Result<(), PlanError> {
        if !self.planes.contains(req.plane) {
            return Err(PlanError::UnknownPlane(req.plane));
        }
        if req.channel >= self.config.channels {
            return Err(PlanError::InvalidChannel(req.channel));
        }
        if let Some(scaler) = req.scaler
            && scaler >= self.config.scalers
        {
            return Err(PlanError::InvalidScaler(scaler));
        }
        if req.surface.crop.is_empty() {
            return Err(PlanError::EmptyCrop(req.plane));
        }
        let missing = ChannelCaps::required_by(req).difference(self.caps[usize::from(req.channel)]);
        if !missing.is_empty() {
            return Err(PlanError::Unsupported {
                channel: req.channel,
                missing,
            });
        }
        Ok(())
    }

    /// Map every accepted plane, build its command list and link the lists
    /// per channel.
    ///
    /// Tables and lists go to each plane's back buffers; registers and the
    /// buffers of the committed frame are left alone. Preparing again
    /// invalidates any earlier [`PreparedFrame`].
    ///
    /// # Errors
    /// [`PlanError::PlanMismatch`] if `plan` was validated from another
    /// request; otherwise as for [`validate`](Self::validate). On error
    /// every staged buffer of the frame is released.
    pub fn prepare<S: ScatterList + ?Sized>(
        &mut self,
        plan: FramePlan,
        frame: &FrameRequest<'_, S>,
    ) -> Result<PreparedFrame, PlanError> {
        if plan.request_len != frame.planes().len() {
            return Err(PlanError::PlanMismatch);
        }
        self.generation = self.generation.wrapping_add(1);
        let touched: Vec<PlaneId> = plan
            .accepted
            .iter()
            .filter_map(|&i| frame.planes().get(i))
            .map(|req| req.plane)
            .collect();
        self.prepare_planes(plan, frame).inspect_err(|_| {
            for &plane in &touched {
                if let Some(state) = self.planes.get_mut(plane) {
                    state.discard();
                }
            }
        })
    }

    fn prepare_planes<S: ScatterList + ?Sized>(
        &mut self,
        plan: FramePlan,
        frame: &FrameRequest<'_, S>,
    ) -> Result<PreparedFrame, PlanError> {
        let policy = self.config.plane_error_policy;
        let FramePlan {
            fbc,
            accepted,
            mut dropped,
            ..
        } = plan;

        let mut groups = ChannelGroups::<Idle>::new();
        for &i in &accepted {
            let req = frame.planes().get(i).ok_or(PlanError::PlanMismatch)?;
            match self.prepare_plane(req, &fbc) {
                Ok(list) => groups.insert(list),
                Err(e) => {
                    absorb(policy, req.plane, e, &mut dropped)?;
                    if let Some(state) = self.planes.get_mut(req.plane) {
                        state.discard();
                    }
                }
            }
        }

        let linked = groups.link(&mut self.planes);
        for ch in linked.active().iter() {
            for list in linked.chain(ch) {
                self.write_list(PlaneId(list.id.0))?;
            }
        }
        log::debug!(
            "frame prepared: {} list(s) on {:?}, {} plane(s) dropped",
            linked.list_count(),
            linked.active(),
            dropped.len()
        );
        Ok(PreparedFrame {
            groups: linked,
            fbc,
            dropped,
            generation: self.generation,
        })
    }

    fn prepare_plane<S: ScatterList + ?Sized>(
        &mut self,
        req: &PlaneRequest<'_, S>,
        fbc: &FbcPlan,
    ) -> Result<ListRef, PlanError> {
        let Self {
            config,
            binder,
            dma,
            planes,
            ..
        } = self;
        let state = planes
            .get_mut(req.plane)
            .ok_or(PlanError::UnknownPlane(req.plane))?;

        state.staged = None;
        let binding = binder.bind(req.channel, &req.surface.layout(), req.memory, dma, &mut state.back.tables)?;
        let mut builder = CmdListBuilder::new();
        binding.register_writes(&mut builder)?;
        fbc.register_writes(req.channel, &mut builder)?;
        req.register_writes(&mut builder, binding.is_translated(), fbc.window(req.channel).is_some())?;
        let list = builder.build(
            Trailer {
                channel: req.channel,
                scaler: req.scaler,
            },
            config.cmdlist_max_rows(),
        )?;

        let bytes = config.cmdlist_bytes;
        let Some(buf) = state.back.list.ensure(dma, bytes, CMDLIST_ALIGN) else {
            log::warn!("{}: no device memory for its command list", req.plane);
            return Err(PlanError::OutOfListMemory { bytes });
        };
        let list_ref = ListRef::new(req.plane.list_id(), req.channel, req.dst_y, buf.device_address())?;
        log::debug!(
            "{}: channel {} from line {}, {} rows at {}",
            req.plane,
            req.channel,
            req.dst_y,
            list.rows().len(),
            list_ref.addr
        );
        state.staged = Some(list);
        Ok(list_ref)
    }

    fn write_list(&mut self, plane: PlaneId) -> Result<(), PlanError> {
        let state = self
            .planes
            .get_mut(plane)
            .ok_or(PlanError::UnknownPlane(plane))?;
        let (Some(list), Some(buf)) = (state.staged.as_ref(), state.back.list.get_mut()) else {
            log::error!("{plane}: scheduled without a command list");
            return Err(PlanError::UnknownPlane(plane));
        };
        list.encode_into(buf.as_bytes_mut())?;
        log::trace!("{plane}: {:?}", list.header());
        Ok(())
    }

    /// Hand a prepared frame to hardware.
    ///
    /// Channels enabled by the previous commit but idle in this frame are
    /// disabled before any channel of this frame is enabled. The frame's
    /// back buffers become the planes' front buffers.
    ///
    /// A frame superseded by a later `prepare` or `destroy_plane` is not
    /// written; the report then shows the unchanged channel set.
    pub fn commit<IO: RegisterIo + ?Sized>(&mut self, frame: PreparedFrame, io: &mut IO) -> CommitReport {
        if frame.generation != self.generation {
            log::error!("stale prepared frame dropped without touching hardware");
            return CommitReport {
                enabled: self.in_use,
                ..CommitReport::default()
            };
        }
        self.generation = self.generation.wrapping_add(1);
        self.on_screen = (0..MAX_CHANNELS)
            .flat_map(|ch| frame.groups.chain(ch))
            .map(|l| PlaneId(l.id.0))
            .collect();
        for &plane in &self.on_screen {
            if let Some(state) = self.planes.get_mut(plane) {
                state.promote();
            }
        }
        let report = frame.groups.commit(io, self.in_use).report();
        self.in_use = report.enabled;
        self.committed_fbc = Some(frame.fbc);
        report
    }

    /// Validate, prepare and commit `frame` in one go.
    ///
    /// # Errors
    /// As for [`validate`](Self::validate) and [`prepare`](Self::prepare);
    /// nothing is written to hardware on error.
    pub fn present<S, IO>(&mut self, frame: &FrameRequest<'_, S>, io: &mut IO) -> Result<CommitReport, PlanError>
    where
        S: ScatterList + ?Sized,
        IO: RegisterIo + ?Sized,
    {
        let plan = self.validate(frame)?;
        let prepared = self.prepare(plan, frame)?;
        Ok(self.commit(prepared, io))
    }

    /// Shut every channel down, as at device teardown.
    pub fn disable_all<IO: RegisterIo + ?Sized>(&mut self, io: &mut IO) -> CommitReport {
        let report = ChannelGroups::<Idle>::new()
            .link(&mut self.planes)
            .commit(io, self.in_use)
            .report();
        self.in_use = ChannelMask::EMPTY;
        self.on_screen.clear();
        self.committed_fbc = None;
        report
    }
}

/// Apply the per-plane error policy: drop the plane, or fail the frame.
fn absorb(
    policy: PlaneErrorPolicy,
    plane: PlaneId,
    err: PlanError,
    dropped: &mut Vec<(PlaneId, PlanError)>,
) -> Result<(), PlanError> {
    if policy == PlaneErrorPolicy::DropPlane && err.class() != ErrorClass::Capacity {
        log::warn!("{plane} left out of the frame: {err}");
        dropped.push((plane, err));
        Ok(())
    } else {
        log::warn!("frame rejected by {plane}: {err}");
        Err(err)
    }
}
