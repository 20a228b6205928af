//! # Display Frame Planner
//!
//! Per-frame resource planning and command-list assembly for the tiled,
//! multi-plane display engine. A [`DisplayEngine`] owns everything that
//! persists between frames and drives the stages in order:
//!
//! ```text
//!   FrameRequest
//!        │ validate      caps, ids, FBC pool split          (pure)
//!        ▼
//!    FramePlan
//!        │ prepare       page tables, register writes,
//!        │               command lists, per-channel links   (device memory)
//!        ▼
//!  PreparedFrame
//!        │ commit        disable idle channels, program
//!        │               chain heads, enable, latch         (registers)
//!        ▼
//!   CommitReport
//! ```
//!
//! Nothing reaches the registers before `commit`, and `commit` cannot fail:
//! every budget is checked while validating and preparing.
//!
//! ## Failure handling
//!
//! Every error carries an [`ErrorClass`]. Capacity errors reject the frame.
//! Consistency and allocation errors reject it too unless the engine is
//! configured with [`PlaneErrorPolicy::DropPlane`], in which case the plane
//! is left out and reported through [`FramePlan::dropped`] /
//! [`PreparedFrame::dropped`].
//!
//! ## Plane lifecycle
//!
//! Planes are created and destroyed explicitly. Each plane holds two sets
//! of translation tables and command-list memory: the front set hardware
//! reads and the back set `prepare` fills. `commit` swaps them, and a
//! failed `prepare` releases the back set, so a rejected frame never
//! disturbs what is on screen. Buffers are acquired on first use, reused
//! while large enough and otherwise released only by
//! [`DisplayEngine::destroy_plane`] or by dropping the engine.
//!
//! ```
//! use display_dma::PoolDmaAllocator;
//! use display_addresses::{DeviceAddress, PhysicalAddress};
//! use display_mmu::SgTable;
//! use display_planner::{DisplayEngine, FrameRequest, PixelFormat, PlaneRequest, Surface, WorkMode};
//! use display_registers::RecordingIo;
//! use display_info::EngineConfig;
//!
//! let dma = PoolDmaAllocator::new(DeviceAddress::new(0x4000_0000), 64, 4096);
//! let mut engine = DisplayEngine::new(EngineConfig::DEFAULT, dma).unwrap();
//! let plane = engine.create_plane().unwrap();
//!
//! let surface = Surface::linear(PixelFormat::Argb8888, 64, 64);
//! let memory = SgTable::contiguous_run(PhysicalAddress::new(0x8000_0000), surface.size);
//! let frame = FrameRequest::new().with(PlaneRequest {
//!     plane,
//!     channel: 0,
//!     scaler: None,
//!     dst_x: 0,
//!     dst_y: 0,
//!     surface,
//!     memory: &memory,
//!     work_mode: WorkMode::SideBySide,
//! });
//!
//! let mut io = RecordingIo::new();
//! let report = engine.present(&frame, &mut io).unwrap();
//! assert_eq!(report.enabled.iter().collect::<Vec<_>>(), [0]);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod caps;
mod engine;
mod error;
mod format;
mod frame;
mod plane;
mod request;

pub use caps::{CapsTable, ChannelCaps, reference_caps};
pub use display_cmdlist::{ChannelMask, CommitReport};
pub use display_fbc::WorkMode;
pub use display_info::PlaneErrorPolicy;
pub use engine::DisplayEngine;
pub use error::{ErrorClass, PlanError};
pub use format::PixelFormat;
pub use frame::{FramePlan, PreparedFrame};
pub use plane::{PlaneArena, PlaneId, PlaneState};
pub use request::{FrameRequest, PlaneRequest, Surface};

#[cfg(feature = "host")]
pub use display_dma::{PoolBuffer, PoolDmaAllocator};
#[cfg(feature = "host")]
pub use display_registers::RecordingIo;
