use crate::caps::ChannelCaps;
use crate::plane::PlaneId;
use display_cmdlist::CmdListError;
use display_fbc::FbcError;
use display_info::ConfigError;
use display_mmu::MmuError;
use display_registers::RegisterError;

/// How a failure is propagated to the compositor.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorClass {
    /// A hardware budget was exceeded; the frame is rejected.
    Capacity,
    /// The request contradicts itself or the hardware.
    Consistency,
    /// Device-visible memory ran out.
    Allocation,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0} does not exist")]
    UnknownPlane(PlaneId),
    #[error("{0} appears twice in the frame")]
    DuplicatePlane(PlaneId),
    #[error("{0} is still scanned out")]
    PlaneOnScreen(PlaneId),
    #[error("{0} has an empty crop rectangle")]
    EmptyCrop(PlaneId),
    #[error("no plane ids left")]
    PlaneIdsExhausted,
    #[error("channel {0} does not exist")]
    InvalidChannel(u8),
    #[error("scaler {0} does not exist")]
    InvalidScaler(u8),
    #[error("channel {channel} lacks {missing:?}")]
    Unsupported { channel: u8, missing: ChannelCaps },
    #[error("frame plan does not belong to this request")]
    PlanMismatch,
    #[error("no device memory for a {bytes} byte command list")]
    OutOfListMemory { bytes: usize },
    #[error(transparent)]
    Fbc(#[from] FbcError),
    #[error(transparent)]
    Mmu(#[from] MmuError),
    #[error(transparent)]
    CmdList(#[from] CmdListError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

impl PlanError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Fbc(e) if e.is_request_error() => ErrorClass::Consistency,
            Self::Fbc(_) | Self::CmdList(CmdListError::Overflow { .. }) => ErrorClass::Capacity,
            Self::Mmu(e) if e.is_capacity() => ErrorClass::Capacity,
            Self::Mmu(MmuError::OutOfMemory { .. }) | Self::OutOfListMemory { .. } | Self::PlaneIdsExhausted => {
                ErrorClass::Allocation
            }
            _ => ErrorClass::Consistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let fbc = FbcError::ExceedsPool {
            channel: 0,
            units: 2000,
            capacity: 1024,
        };
        assert_eq!(PlanError::from(fbc).class(), ErrorClass::Capacity);
        assert_eq!(
            PlanError::from(FbcError::DuplicateChannel(1)).class(),
            ErrorClass::Consistency
        );
        assert_eq!(
            PlanError::from(MmuError::OutOfMemory { bytes: 64 }).class(),
            ErrorClass::Allocation
        );
        assert_eq!(
            PlanError::from(MmuError::PageListExhausted { expected: 2, got: 1 }).class(),
            ErrorClass::Consistency
        );
        assert_eq!(
            PlanError::from(CmdListError::Overflow { rows: 200, max: 170 }).class(),
            ErrorClass::Capacity
        );
        assert_eq!(PlanError::InvalidScaler(9).class(), ErrorClass::Consistency);
    }
}
