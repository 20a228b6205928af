//! # Engine Configuration
//!
//! Per display-engine-instance parameters. One [`EngineConfig`] is handed to
//! the planner at device init and stays fixed for the lifetime of the
//! instance.

use crate::hw::{
    CMD_HEADER_BYTES, CMD_ROW_BYTES, CMD_TRAILER_ROWS, CMDLIST_ALIGN, FBC_UNIT_BYTES, MAX_CHANNELS,
    MMU_PAGE_BYTES,
};

/// What the planner does when a single plane fails to map or build.
///
/// Capacity errors (FBC pools, command buffer overflow) always reject the
/// whole frame regardless of this policy.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PlaneErrorPolicy {
    /// Fail the whole frame; the compositor keeps the previous configuration.
    #[default]
    RejectFrame,
    /// Treat the failing plane as absent for this frame and carry on.
    DropPlane,
}

/// Parameters describing one integration of the display engine.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EngineConfig {
    /// Number of pixel-fetch channels. Must be even; channels are paired for FBC.
    pub channels: u8,
    /// Number of scaler units that can be routed to a channel.
    pub scalers: u8,
    /// Number of on-chip FBC pools. One pool per channel pair.
    pub fbc_pools: u8,
    /// Capacity of each FBC pool in [`FBC_UNIT_BYTES`] units.
    pub fbc_pool_units: u32,
    /// Size of the per-plane command-list buffer in bytes.
    pub cmdlist_bytes: usize,
    /// Duplicate-of-last entries appended after the real table entries.
    pub mmu_pad_entries: usize,
    /// The entry count of a table is rounded up to a multiple of this.
    pub mmu_align_entries: usize,
    /// Maximum entries in a single translation table.
    pub mmu_table_max_entries: usize,
    /// Device virtual base address of channel 0's fetch window.
    pub mmu_va_base: u64,
    /// Size of each channel's device virtual fetch window.
    pub mmu_window_bytes: u64,
    /// Propagation policy for per-plane failures.
    pub plane_error_policy: PlaneErrorPolicy,
}

impl EngineConfig {
    /// The reference integration: 8 channels in 4 FBC pairs, 32 KiB per pool.
    pub const DEFAULT: Self = Self {
        channels: 8,
        scalers: 4,
        fbc_pools: 4,
        fbc_pool_units: 1024,
        cmdlist_bytes: 4096,
        mmu_pad_entries: 16,
        mmu_align_entries: 16,
        mmu_table_max_entries: 16 * 1024,
        mmu_va_base: 0x1000_0000,
        mmu_window_bytes: 0x1000_0000,
        plane_error_policy: PlaneErrorPolicy::RejectFrame,
    };

    /// Capacity of one FBC pool in bytes.
    #[inline]
    #[must_use]
    pub const fn fbc_pool_bytes(&self) -> u64 {
        self.fbc_pool_units as u64 * FBC_UNIT_BYTES as u64
    }

    /// Maximum number of rows (including trailer rows) a command list can hold.
    #[inline]
    #[must_use]
    pub const fn cmdlist_max_rows(&self) -> usize {
        self.cmdlist_bytes.saturating_sub(CMD_HEADER_BYTES) / CMD_ROW_BYTES
    }

    /// Device virtual base of the fetch window owned by `channel`.
    #[inline]
    #[must_use]
    pub const fn channel_window_base(&self, channel: u8) -> u64 {
        self.mmu_va_base + channel as u64 * self.mmu_window_bytes
    }

    /// Check the configuration for internal consistency.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::ChannelCount(self.channels));
        }
        if !self.channels.is_multiple_of(2) {
            return Err(ConfigError::UnpairedChannels(self.channels));
        }
        if self.fbc_pools as u32 * 2 != self.channels as u32 {
            return Err(ConfigError::PoolCount {
                pools: self.fbc_pools,
                channels: self.channels,
            });
        }
        if self.cmdlist_max_rows() <= CMD_TRAILER_ROWS
            || !self.cmdlist_bytes.is_multiple_of(CMDLIST_ALIGN as usize)
        {
            return Err(ConfigError::CommandBufferTooSmall(self.cmdlist_bytes));
        }
        if self.mmu_align_entries == 0 || !self.mmu_align_entries.is_power_of_two() {
            return Err(ConfigError::TableAlignment(self.mmu_align_entries));
        }
        if self.mmu_window_bytes == 0 || !self.mmu_window_bytes.is_multiple_of(MMU_PAGE_BYTES) {
            return Err(ConfigError::WindowAlignment(self.mmu_window_bytes));
        }
        if self.channel_window_base(self.channels) > 1 << 32 {
            return Err(ConfigError::WindowSpace);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reasons an [`EngineConfig`] is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported channel count {0}")]
    ChannelCount(u8),
    #[error("channel count {0} is odd; channels are paired for FBC")]
    UnpairedChannels(u8),
    #[error("{pools} FBC pools do not match {channels} channels")]
    PoolCount { pools: u8, channels: u8 },
    #[error("command-list buffer of {0} bytes cannot hold the trailer rows")]
    CommandBufferTooSmall(usize),
    #[error("table alignment of {0} entries is not a power of two")]
    TableAlignment(usize),
    #[error("fetch window size {0:#x} is not page aligned")]
    WindowAlignment(u64),
    #[error("fetch windows exceed the 32-bit virtual address registers")]
    WindowSpace,
}

const _: () = {
    assert!(EngineConfig::DEFAULT.validate().is_ok());
};
