use crate::error::PlanError;
use crate::plane::PlaneId;
use alloc::vec::Vec;
use display_cmdlist::{ChannelGroups, ChannelMask, Linked, ListRef};
use display_fbc::FbcPlan;

/// Outcome of validating a frame: which planes go ahead and how FBC memory
/// is split between channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub(crate) fbc: FbcPlan,
    /// Indices into the request's planes, in request order.
    pub(crate) accepted: Vec<usize>,
    pub(crate) dropped: Vec<(PlaneId, PlanError)>,
    pub(crate) request_len: usize,
}

impl FramePlan {
    #[must_use]
    pub const fn fbc(&self) -> &FbcPlan {
        &self.fbc
    }

    /// Planes left out of the frame and why.
    #[must_use]
    pub fn dropped(&self) -> &[(PlaneId, PlanError)] {
        &self.dropped
    }

    /// Number of planes that will be prepared.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted.len()
    }
}

/// A frame whose command lists are built, linked and written to device
/// memory, ready to be handed to hardware.
#[derive(Debug)]
pub struct PreparedFrame {
    pub(crate) groups: ChannelGroups<Linked>,
    pub(crate) fbc: FbcPlan,
    pub(crate) dropped: Vec<(PlaneId, PlanError)>,
    pub(crate) generation: u64,
}

impl PreparedFrame {
    /// Channels that will run once committed.
    #[must_use]
    pub fn active(&self) -> ChannelMask {
        self.groups.active()
    }

    /// Lists of `channel` in execution order.
    #[must_use]
    pub fn chain(&self, channel: u8) -> &[ListRef] {
        self.groups.chain(channel)
    }

    #[must_use]
    pub const fn fbc(&self) -> &FbcPlan {
        &self.fbc
    }

    /// Planes left out during validation or preparation.
    #[must_use]
    pub fn dropped(&self) -> &[(PlaneId, PlanError)] {
        &self.dropped
    }
}
