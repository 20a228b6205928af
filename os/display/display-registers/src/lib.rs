//! # Display Engine Registers
//!
//! Data-driven register access for the display engine.
//!
//! Every hardware module is described once by a [`RegisterBlock`]: its base
//! offset, the stride between instances (one instance per channel for the
//! fetch and MMU blocks) and a table of field names with their byte offsets.
//! All reads and writes, whether issued directly against MMIO during commit
//! or accumulated into a command list, resolve through the same descriptor:
//!
//! ```text
//!   block.at(instance, field) ──► RegisterRef (absolute byte offset)
//!                                      │
//!                ┌─────────────────────┴──────────────────────┐
//!                ▼                                            ▼
//!       RegisterIo::write (MMIO)                  command row address field
//!                                                 (RegisterRef::word_index)
//! ```
//!
//! Typed views of the control registers live in [`layout`]; the block
//! descriptors in [`map`].

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod layout;
pub mod map;
#[cfg(any(test, feature = "recording"))]
mod recording;

#[cfg(any(test, feature = "recording"))]
pub use recording::RecordingIo;

use alloc::vec::Vec;
use core::fmt;

/// Byte offset of a field inside its [`RegisterBlock`] instance.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldOffset(pub u32);

impl FieldOffset {
    /// The field `words` 32-bit registers after this one.
    #[inline]
    #[must_use]
    pub const fn next(self, words: u32) -> Self {
        Self(self.0 + words * 4)
    }
}

/// Absolute byte offset of a register in the display engine's MMIO window.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegisterRef(u32);

impl RegisterRef {
    #[inline]
    #[must_use]
    pub const fn from_offset(offset: u32) -> Self {
        debug_assert!(offset.is_multiple_of(4), "registers are 32-bit aligned");
        Self(offset)
    }

    /// Build from a 32-bit word index (the command row address encoding).
    #[inline]
    #[must_use]
    pub const fn from_word_index(index: u32) -> Self {
        Self(index << 2)
    }

    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0
    }

    /// Offset in 32-bit words, as carried in a command row.
    #[inline]
    #[must_use]
    pub const fn word_index(self) -> u32 {
        self.0 >> 2
    }

    /// The register directly after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 4)
    }
}

impl fmt::Debug for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reg({:#06x})", self.0)
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Descriptor of one hardware module.
#[derive(Debug)]
pub struct RegisterBlock {
    /// Module name, used in diagnostics.
    pub name: &'static str,
    /// Byte offset of instance 0.
    pub base: u32,
    /// Byte distance between consecutive instances.
    pub stride: u32,
    /// Number of instances present in the hardware.
    pub instances: u8,
    /// Field name → byte offset within an instance.
    pub fields: &'static [(&'static str, FieldOffset)],
}

impl RegisterBlock {
    /// Resolve a statically known field of `instance`.
    ///
    /// # Errors
    /// [`RegisterError::InvalidInstance`] if `instance` is out of range.
    #[inline]
    pub const fn at(&self, instance: u8, field: FieldOffset) -> Result<RegisterRef, RegisterError> {
        if instance >= self.instances {
            return Err(RegisterError::InvalidInstance {
                block: self.name,
                instance,
            });
        }
        debug_assert!(field.0 < self.stride || self.instances == 1);
        Ok(RegisterRef::from_offset(
            self.base + instance as u32 * self.stride + field.0,
        ))
    }

    /// Resolve a field of `instance` by name.
    ///
    /// # Errors
    /// [`RegisterError::UnknownField`] if the block has no such field,
    /// [`RegisterError::InvalidInstance`] if `instance` is out of range.
    pub fn field(&self, instance: u8, name: &str) -> Result<RegisterRef, RegisterError> {
        let offset = self
            .fields
            .iter()
            .find_map(|&(n, off)| (n == name).then_some(off))
            .ok_or(RegisterError::UnknownField { block: self.name })?;
        self.at(instance, offset)
    }

    /// Look up the name of the field at `reg`, if it belongs to this block.
    #[must_use]
    pub fn describe(&self, reg: RegisterRef) -> Option<(u8, &'static str)> {
        let rel = reg.offset().checked_sub(self.base)?;
        let (instance, within) = if self.instances == 1 {
            (0, rel)
        } else {
            (rel / self.stride, rel % self.stride)
        };
        let instance = u8::try_from(instance).ok().filter(|&i| i < self.instances)?;
        self.fields
            .iter()
            .find_map(|&(n, off)| (off.0 == within).then_some((instance, n)))
    }
}

/// Register resolution failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error("{block}: instance {instance} does not exist")]
    InvalidInstance { block: &'static str, instance: u8 },
    #[error("{block}: unknown field")]
    UnknownField { block: &'static str },
}

/// The hardware access seam: 32-bit reads and writes at absolute offsets.
///
/// Implemented by the MMIO mapping on target and by [`RecordingIo`] on the host.
pub trait RegisterIo {
    fn read(&mut self, reg: RegisterRef) -> u32;
    fn write(&mut self, reg: RegisterRef, value: u32);
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    #[inline]
    fn read(&mut self, reg: RegisterRef) -> u32 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&mut self, reg: RegisterRef, value: u32) {
        (**self).write(reg, value);
    }
}

/// Destination for register writes that are staged rather than issued.
///
/// The FBC plan and the translation binder describe their programming as a
/// stream of writes; the command-list builder is the production sink and a
/// plain `Vec` serves tests and diagnostics.
pub trait RegisterSink {
    fn stage(&mut self, reg: RegisterRef, value: u32);
}

impl RegisterSink for Vec<(RegisterRef, u32)> {
    #[inline]
    fn stage(&mut self, reg: RegisterRef, value: u32) {
        self.push((reg, value));
    }
}

impl<T: RegisterSink + ?Sized> RegisterSink for &mut T {
    #[inline]
    fn stage(&mut self, reg: RegisterRef, value: u32) {
        (**self).stage(reg, value);
    }
}

/// Write `value` to field `name` of `block[instance]`.
///
/// # Errors
/// Propagates resolution failures from [`RegisterBlock::field`]; nothing is
/// written in that case.
pub fn write_field<IO: RegisterIo + ?Sized>(
    io: &mut IO,
    block: &RegisterBlock,
    instance: u8,
    name: &str,
    value: u32,
) -> Result<(), RegisterError> {
    let reg = block.field(instance, name)?;
    io.write(reg, value);
    Ok(())
}

/// Read field `name` of `block[instance]`.
///
/// # Errors
/// Propagates resolution failures from [`RegisterBlock::field`].
pub fn read_field<IO: RegisterIo + ?Sized>(
    io: &mut IO,
    block: &RegisterBlock,
    instance: u8,
    name: &str,
) -> Result<u32, RegisterError> {
    let reg = block.field(instance, name)?;
    Ok(io.read(reg))
}
