//! # Command Lists
//!
//! Packs per-plane register writes into hardware command lists and chains
//! them per channel for the display engine's sequencer.
//!
//! ## Wire format
//!
//! All words are little-endian.
//!
//! ```text
//!   header (16 B)     ┌──────────────────────────────┬──────────┐
//!                     │ next:34 │ rows:16 │ terminal:1│ reserved │
//!                     └──────────────────────────────┴──────────┘
//!   row (24 B) × n    ┌──────────────────────────────┬────┬────┬────┬──────────┐
//!                     │ addr:32 │ strobe:12 │ end:2  │ v0 │ v1 │ v2 │ reserved │
//!                     └──────────────────────────────┴────┴────┴────┴──────────┘
//! ```
//!
//! `addr` is the register word index of slot 0; slot `i` writes register
//! `addr + i` when its strobe nibble is set. Every list ends with three
//! trailer rows:
//!
//! | Row | Target | Value |
//! |-----|--------|-------|
//! | scaler select | `CHAN.SCALER_SEL` | scaler routing of the plane |
//! | next list | `CHAN.CMD_NEXT_LO/HI/VPOS` | successor, zero while terminal |
//! | terminal | `TOP.CHANNEL_EN_SET` | the channel's bit, tagged [`END_OF_LIST`] |
//!
//! ## Scheduling
//!
//! [`ChannelGroups`] collects [`ListRef`]s per channel, orders them by first
//! line, links each list to its successor and finally hands the chain heads
//! to hardware:
//!
//! ```text
//!   ChannelGroups<Idle> ──insert*──► link(arena) ──► ChannelGroups<Linked>
//!                                                         │ commit(io, previous)
//!                                                         ▼
//!                                                ChannelGroups<Committed>
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod list;
mod row;
mod schedule;

pub use list::{CmdListBuilder, CommandList, NextList, Trailer};
pub use row::{CmdRow, END_OF_LIST, ListHeader, RowControl};
pub use schedule::{
    ChannelGroups, ChannelMask, CommitReport, Committed, Idle, Linked, ListArena, ListId, ListRef,
};

use display_addresses::DeviceAddress;
use display_registers::RegisterError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CmdListError {
    #[error("command list needs {rows} rows, buffer holds {max}")]
    Overflow { rows: usize, max: usize },
    #[error("channel {0} does not exist")]
    InvalidChannel(u8),
    #[error("command list truncated: {len} bytes, {needed} needed")]
    Truncated { len: usize, needed: usize },
    #[error("malformed command row {0}")]
    MalformedRow(usize),
    #[error("sequencer cannot fetch a command list at {0}")]
    BadListAddress(DeviceAddress),
    #[error(transparent)]
    Register(#[from] RegisterError),
}
