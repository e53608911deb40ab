// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scratch buffers for bidirectional data phases.
//!
//! Lengths are validated before anything is allocated, and release is
//! the `Drop` impl, so every exit path frees exactly once.

use std::ops::{Deref, DerefMut};

use zerocopy::FromBytes;

use crate::models::{
    boundary::BoundaryBuffer,
    envelope::{SECURITY_HEADER_LEN, SecurityIoctlHeader},
    errors::IoctlError,
};

/// Upper bound on a single variable-length transfer.
pub const MAX_BUFFLEN: usize = 32 * 512;

/// A zeroed, length-validated transfer buffer scoped to one command
/// execution.
#[derive(Debug)]
pub struct ScratchBuffer {
    data: Vec<u8>,
}

impl ScratchBuffer {
    /// Allocate a zeroed buffer of `len` bytes.
    ///
    /// Fails with `InvalidArgument` before allocating when `len` is zero
    /// or exceeds `max`, and with `OutOfMemory` when the reservation
    /// itself fails.
    pub fn zeroed(len: usize, max: usize) -> Result<Self, IoctlError> {
        if len == 0 || len > max {
            return Err(IoctlError::InvalidArgument);
        }

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| IoctlError::OutOfMemory)?;
        data.resize(len, 0);

        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Deref for ScratchBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ScratchBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Copy the request-envelope header across the boundary and decode it.
pub fn read_security_header(
    arg: &(impl BoundaryBuffer + ?Sized),
) -> Result<SecurityIoctlHeader, IoctlError> {
    let mut raw = [0u8; SECURITY_HEADER_LEN];
    arg.read(0, &mut raw)?;
    SecurityIoctlHeader::read_from_bytes(&raw).map_err(|_| IoctlError::InvalidArgument)
}

/// Stage a to-device transfer: validate, allocate and copy the caller's
/// inline payload (immediately after the header) into device-local
/// memory.
pub fn stage_out_data(
    arg: &(impl BoundaryBuffer + ?Sized),
    len: usize,
    max: usize,
) -> Result<ScratchBuffer, IoctlError> {
    let mut buf = ScratchBuffer::zeroed(len, max)?;
    arg.read(SECURITY_HEADER_LEN, buf.as_mut_slice())?;
    Ok(buf)
}

/// Complete a from-device transfer: copy `len` bytes of device data back
/// to the caller, immediately after the header.
pub fn write_in_data(
    arg: &mut (impl BoundaryBuffer + ?Sized),
    buf: &ScratchBuffer,
    len: usize,
) -> Result<(), IoctlError> {
    let n = len.min(buf.len());
    arg.write(SECURITY_HEADER_LEN, &buf.as_slice()[..n])?;
    Ok(())
}
