// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The trust boundary between caller-supplied memory and this core.
//!
//! Caller buffers are not trusted and not guaranteed stable: everything
//! is copied into device-local memory before use, and any access outside
//! the caller's mapping is a fault, never a panic.

use thiserror::Error;

/// A caller-side access failed: source unreadable or destination
/// unwritable. Maps to `IoctlError::FaultyAddress` at the dispatch layer.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("caller buffer access out of range")]
pub struct BoundaryFault;

/// Caller-owned memory on the far side of the trust boundary.
///
/// Offsets are byte-granular. Implementations must fail with
/// [`BoundaryFault`] on any out-of-range access instead of truncating.
pub trait BoundaryBuffer: Send {
    /// Total bytes the caller handed over. A zero-length buffer models a
    /// caller that passed no argument at all.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `dst.len()` bytes from the caller's memory at `offset`.
    fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), BoundaryFault>;

    /// Copy `src` into the caller's memory at `offset`.
    fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), BoundaryFault>;
}

impl BoundaryBuffer for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), BoundaryFault> {
        let end = offset.checked_add(dst.len()).ok_or(BoundaryFault)?;
        let src = self.get(offset..end).ok_or(BoundaryFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), BoundaryFault> {
        let end = offset.checked_add(src.len()).ok_or(BoundaryFault)?;
        let dst = self.get_mut(offset..end).ok_or(BoundaryFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// Privilege and blocking-mode bits the caller carries across the
/// boundary. The surrounding driver fills this in from its own notion of
/// capabilities and open-file flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerContext {
    /// Administrative capability.
    pub sys_admin: bool,
    /// Raw-command capability. Raw command injection requires both bits.
    pub sys_rawio: bool,
    /// The caller opened the device non-blocking; only the reset path
    /// honours this during error recovery.
    pub nonblocking: bool,
}

impl CallerContext {
    /// A fully privileged, blocking caller.
    pub fn elevated() -> Self {
        Self {
            sys_admin: true,
            sys_rawio: true,
            nonblocking: false,
        }
    }
}
