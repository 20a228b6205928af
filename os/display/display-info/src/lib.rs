//! # Display Engine Configuration
//!
//! This crate is the single source of truth for the hardware constants and
//! per-instance parameters shared by every stage of the display pipeline
//! planner: the FBC pool allocator, the page-table binder, the command-list
//! builder and the channel-group committer.
//!
//! ## Overview
//!
//! Two kinds of information live here:
//!
//! ### Hardware constants ([`hw`])
//! Values fixed by the silicon and never configurable:
//! * **FBC unit**: the 32-byte granule FBC pool sizes and offsets are expressed in
//! * **Command row geometry**: row width, slots per row, header width, trailer rows
//! * **Address widths**: the 34-bit command-list pointer, plane count limits
//!
//! ### Engine configuration ([`config`])
//! Values that differ between SoC integrations of the same display engine:
//! * **Topology**: number of pixel-fetch channels, scalers and FBC pools
//! * **Budgets**: pool capacity, command-list buffer size, translation-table limits
//! * **Policy**: how per-plane failures are propagated to the compositor
//!
//! ### Surface vocabulary ([`surface`])
//! Rotation, compression modifier and crop rectangle as handed over by the
//! compositor.
//!
//! ```text
//!            ┌─────────────────────────────┐
//!            │        EngineConfig         │
//!            └──┬──────────┬───────────┬───┘
//!               │          │           │
//!        ┌──────▼───┐ ┌────▼─────┐ ┌───▼────────┐
//!        │ FBC pool │ │ Page-    │ │ Command    │
//!        │ planner  │ │ table    │ │ list +     │
//!        │          │ │ binder   │ │ committer  │
//!        └──────────┘ └──────────┘ └────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod config;
pub mod hw;
pub mod surface;

pub use config::{ConfigError, EngineConfig, PlaneErrorPolicy};
