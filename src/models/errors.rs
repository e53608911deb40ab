// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

use crate::{models::boundary::BoundaryFault, transport::TransportError};

/// Everything a dispatch call can fail with before or around command
/// execution. Device-reported statuses are not errors: they travel back
/// through the `Ok(i32)` channel after sense interpretation.
#[derive(Debug, Error)]
pub enum IoctlError {
    /// The caller lacks the capabilities required for raw command
    /// injection.
    #[error("operation not permitted")]
    PermissionDenied,

    /// A length, opcode parameter or driver-family exclusion rejected the
    /// request before any command was issued.
    #[error("invalid argument")]
    InvalidArgument,

    /// Copying across the trust boundary failed.
    #[error("bad address in caller buffer")]
    FaultyAddress,

    /// The device is offline, or error recovery left it unusable.
    #[error("no such device")]
    NoSuchDevice,

    /// The opcode is outside the closed table and no host-specific
    /// handler is installed.
    #[error("unsupported ioctl request code {0:#06x}")]
    NotSupported(u32),

    /// Scratch buffer allocation failed.
    #[error("out of memory allocating transfer buffer")]
    OutOfMemory,

    /// Error recovery is in progress and the caller asked not to wait.
    #[error("device busy, recovery in progress")]
    DeviceBusy,

    /// The transport failed to execute the command at all.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl IoctlError {
    /// The negative errno-style code for embedders that speak the numeric
    /// ABI. `NotSupported` keeps the historical EINVAL mapping even though
    /// the typed variant is distinct.
    pub fn errno(&self) -> i32 {
        match self {
            Self::PermissionDenied => -13, // EACCES
            Self::InvalidArgument => -22,  // EINVAL
            Self::FaultyAddress => -14,    // EFAULT
            Self::NoSuchDevice => -19,     // ENODEV
            Self::NotSupported(_) => -22,  // EINVAL, historical ABI
            Self::OutOfMemory => -12,      // ENOMEM
            Self::DeviceBusy => -11,       // EAGAIN
            Self::Transport(_) => -5,      // EIO
        }
    }
}

impl From<BoundaryFault> for IoctlError {
    fn from(_: BoundaryFault) -> Self {
        Self::FaultyAddress
    }
}
