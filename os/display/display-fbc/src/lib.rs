//! # FBC Pool Allocator
//!
//! Shares the display engine's on-chip frame-buffer-compression memory
//! between pixel-fetch channels for one frame.
//!
//! ## Topology
//!
//! There is one fixed-capacity pool per channel pair. Pool `k` belongs to
//! channels `2k` (even, the owner) and `2k + 1` (odd, the partner):
//!
//! ```text
//!   pool 0                       pool 1
//!   ┌──────────────┬─────────┐   ┌──────┬──────────────────┐
//!   │ ch 0 (even)  │ ch 1 ─ ─│─ ─│─► ch1│ (reserved)       │
//!   └──────────────┴─────────┘   └──────┴──────────────────┘
//!   0             600      1024  0     76               1024
//! ```
//!
//! ## Placement rules
//!
//! 1. The even channel is granted `[0, need)` of its own pool.
//! 2. The odd channel takes what is left behind the even channel.
//! 3. If that is not enough, the odd channel borrows the shortfall from the
//!    next pool `(k + 1) mod N`, at offset 0. The lender must not have been
//!    touched this frame, which for pool 0 (the only pool visited before its
//!    borrower) means pool 0 must be entirely unused.
//! 4. A lent pool is reserved for its borrower: any later demand from the
//!    pair that owns it is rejected rather than packed around the loan.
//!
//! Channels that need nothing are skipped and touch no pool.
//!
//! The allocator itself is stateless across frames: [`FbcPools`] holds only
//! the topology, and each call to [`FbcPools::allocate`] returns a fresh
//! [`FbcPlan`]. Identical inputs always yield identical plans.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod plan;
mod request;

pub use plan::{FbcPlan, FbcSpill, FbcWindow, PoolUsage};
pub use request::{FbcRequest, FbcSurface, WorkMode};

use display_info::EngineConfig;
use display_info::hw::MAX_CHANNELS;

/// Most pools the engine can have: one per channel pair.
pub const MAX_POOLS: usize = MAX_CHANNELS as usize / 2;

/// Pool topology of one display engine instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FbcPools {
    pools: u8,
    capacity: u32,
}

impl FbcPools {
    /// `pools` pools of `capacity` FBC units each.
    #[must_use]
    pub const fn new(pools: u8, capacity: u32) -> Self {
        assert!(pools as usize <= MAX_POOLS, "more pools than channel pairs");
        Self { pools, capacity }
    }

    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.fbc_pools, config.fbc_pool_units)
    }

    #[inline]
    #[must_use]
    pub const fn pools(&self) -> u8 {
        self.pools
    }

    /// Capacity of every pool in FBC units.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Channels served by the pools.
    #[inline]
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.pools * 2
    }

    /// Place every request into the pools.
    ///
    /// Requests may arrive in any order; channels without a request need
    /// nothing.
    ///
    /// # Errors
    /// Any request that cannot be placed fails the whole allocation; no
    /// partial plan is returned.
    pub fn allocate(&self, requests: &[FbcRequest]) -> Result<FbcPlan, FbcError> {
        let mut need = [0u32; MAX_CHANNELS as usize];
        let mut seen = 0u32;
        for req in requests {
            if req.channel >= self.channels() {
                return Err(FbcError::InvalidChannel(req.channel));
            }
            if seen & (1 << req.channel) != 0 {
                return Err(FbcError::DuplicateChannel(req.channel));
            }
            seen |= 1 << req.channel;
            need[usize::from(req.channel)] = req.units;
        }

        let mut plan = FbcPlan::empty(self.pools, self.capacity);
        for pool in 0..self.pools {
            self.place_pair(&mut plan, pool, &need)?;
        }
        Ok(plan)
    }

    fn place_pair(&self, plan: &mut FbcPlan, pool: u8, need: &[u32]) -> Result<(), FbcError> {
        let cap = self.capacity;
        let (even, odd) = (pool * 2, pool * 2 + 1);
        let (e, o) = (need[usize::from(even)], need[usize::from(odd)]);
        if e == 0 && o == 0 {
            return Ok(());
        }

        if let Some(borrower) = plan.usage(pool).lent_to {
            let channel = if e > 0 { even } else { odd };
            log::warn!("FBC: pool {pool} is lent to channel {borrower}, channel {channel} rejected");
            return Err(FbcError::PoolReserved { channel, pool });
        }
        if e > cap {
            return Err(FbcError::ExceedsPool {
                channel: even,
                units: e,
                capacity: cap,
            });
        }

        plan.touch(pool, e);
        if e > 0 {
            plan.place(
                even,
                FbcWindow {
                    pool,
                    start: 0,
                    size: e,
                    shared: o > 0,
                    spill: None,
                },
            );
        }
        if o == 0 {
            return Ok(());
        }

        let left = cap - e;
        if o <= left {
            plan.touch(pool, o);
            plan.place(
                odd,
                FbcWindow {
                    pool,
                    start: e,
                    size: o,
                    shared: e > 0,
                    spill: None,
                },
            );
            return Ok(());
        }

        let shortfall = o - left;
        let lender = (pool + 1) % self.pools;
        if shortfall > cap {
            return Err(FbcError::BorrowTooLarge {
                channel: odd,
                shortfall,
                capacity: cap,
            });
        }
        if plan.usage(lender).touched {
            log::warn!("FBC: channel {odd} cannot borrow {shortfall} units, pool {lender} already in use");
            return Err(FbcError::PoolInUse {
                channel: odd,
                pool: lender,
            });
        }

        plan.touch(pool, left);
        plan.touch(lender, shortfall);
        plan.lend(lender, odd);
        plan.place(
            odd,
            FbcWindow {
                pool,
                start: e,
                size: left,
                shared: e > 0,
                spill: Some(FbcSpill {
                    pool: lender,
                    start: 0,
                    size: shortfall,
                }),
            },
        );
        Ok(())
    }
}

/// Reasons an FBC allocation is rejected. All of them are capacity
/// violations except the two request-shape errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FbcError {
    #[error("channel {0} has no FBC pool")]
    InvalidChannel(u8),
    #[error("channel {0} requested FBC memory twice")]
    DuplicateChannel(u8),
    #[error("channel {channel} needs {units} FBC units, pool holds {capacity}")]
    ExceedsPool { channel: u8, units: u32, capacity: u32 },
    #[error("channel {channel} would borrow {shortfall} FBC units, more than a pool's {capacity}")]
    BorrowTooLarge { channel: u8, shortfall: u32, capacity: u32 },
    #[error("channel {channel} cannot borrow from pool {pool}: already in use this frame")]
    PoolInUse { channel: u8, pool: u8 },
    #[error("channel {channel} cannot use pool {pool}: lent to another pair this frame")]
    PoolReserved { channel: u8, pool: u8 },
}

impl FbcError {
    /// The request was malformed rather than too large.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::InvalidChannel(_) | Self::DuplicateChannel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pools() -> FbcPools {
        FbcPools::new(2, 1024)
    }

    #[test]
    fn odd_channel_borrows_the_shortfall() {
        let plan = two_pools()
            .allocate(&[FbcRequest::new(0, 600), FbcRequest::new(1, 500)])
            .unwrap();

        let even = plan.window(0).unwrap();
        assert_eq!((even.pool, even.start, even.size), (0, 0, 600));
        assert!(even.shared);

        let odd = plan.window(1).unwrap();
        assert_eq!((odd.pool, odd.start, odd.size), (0, 600, 424));
        assert_eq!(
            odd.spill,
            Some(FbcSpill {
                pool: 1,
                start: 0,
                size: 76
            })
        );
        assert_eq!(odd.total_units(), 500);
        assert_eq!(plan.usage(0).used, 1024);
        assert_eq!(plan.usage(1).used, 76);
        assert_eq!(plan.usage(1).lent_to, Some(1));
    }

    #[test]
    fn both_channels_fit_in_their_pool() {
        let plan = two_pools()
            .allocate(&[FbcRequest::new(1, 100), FbcRequest::new(0, 200)])
            .unwrap();
        assert_eq!(plan.window(1).map(|w| (w.start, w.size)), Some((200, 100)));
        assert!(plan.window(1).unwrap().spill.is_none());
        assert!(!plan.usage(1).touched);
    }

    #[test]
    fn even_channel_may_take_the_whole_pool() {
        let pools = two_pools();
        let plan = pools.allocate(&[FbcRequest::new(0, 1024)]).unwrap();
        assert_eq!(plan.usage(0).used, 1024);

        let plan = pools
            .allocate(&[FbcRequest::new(0, 1024), FbcRequest::new(1, 1024)])
            .unwrap();
        let odd = plan.window(1).unwrap();
        assert_eq!(odd.size, 0);
        assert_eq!(odd.spill.map(|s| s.size), Some(1024));

        assert_eq!(
            pools.allocate(&[FbcRequest::new(0, 1024), FbcRequest::new(1, 1025)]),
            Err(FbcError::BorrowTooLarge {
                channel: 1,
                shortfall: 1025,
                capacity: 1024
            })
        );
    }

    #[test]
    fn even_channel_over_capacity_fails() {
        assert!(matches!(
            two_pools().allocate(&[FbcRequest::new(2, 1025)]),
            Err(FbcError::ExceedsPool { channel: 2, .. })
        ));
    }

    #[test]
    fn zero_requests_touch_nothing() {
        let plan = two_pools()
            .allocate(&[FbcRequest::new(0, 0), FbcRequest::new(3, 0)])
            .unwrap();
        assert_eq!(plan.windows().count(), 0);
        assert!(!plan.usage(0).touched && !plan.usage(1).touched);
    }

    #[test]
    fn lent_pool_rejects_its_owner() {
        let err = two_pools()
            .allocate(&[
                FbcRequest::new(0, 600),
                FbcRequest::new(1, 500),
                FbcRequest::new(2, 10),
            ])
            .unwrap_err();
        assert_eq!(err, FbcError::PoolReserved { channel: 2, pool: 1 });
    }

    #[test]
    fn wrapping_borrow_needs_an_unused_pool_zero() {
        let pools = two_pools();
        let plan = pools
            .allocate(&[FbcRequest::new(2, 1000), FbcRequest::new(3, 100)])
            .unwrap();
        assert_eq!(plan.window(3).and_then(|w| w.spill).map(|s| s.pool), Some(0));

        assert_eq!(
            pools.allocate(&[
                FbcRequest::new(0, 1),
                FbcRequest::new(2, 1000),
                FbcRequest::new(3, 100)
            ]),
            Err(FbcError::PoolInUse { channel: 3, pool: 0 })
        );
    }

    #[test]
    fn single_pool_cannot_lend_to_itself() {
        assert_eq!(
            FbcPools::new(1, 64).allocate(&[FbcRequest::new(0, 10), FbcRequest::new(1, 60)]),
            Err(FbcError::PoolInUse { channel: 1, pool: 0 })
        );
    }

    #[test]
    fn malformed_requests() {
        let pools = two_pools();
        assert_eq!(
            pools.allocate(&[FbcRequest::new(4, 1)]),
            Err(FbcError::InvalidChannel(4))
        );
        let err = pools
            .allocate(&[FbcRequest::new(1, 1), FbcRequest::new(1, 2)])
            .unwrap_err();
        assert_eq!(err, FbcError::DuplicateChannel(1));
        assert!(err.is_request_error());
    }
}
