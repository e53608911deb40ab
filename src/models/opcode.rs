// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The closed set of device-control request codes this dispatcher accepts.
//!
//! Values are a stable ABI inherited from the historical ioctl numbering:
//! the small sequential codes predate the unique-number scheme and are the
//! ones retired in favour of the block-layer passthrough; the `0x53xx`
//! block follows the newer scheme. Anything outside this table is handed
//! to the host-specific handler.

use core::fmt;

use thiserror::Error;

/// Device-control opcodes understood by the dispatcher.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlOpcode {
    SendCommand = 0x0001,
    TestUnitReady = 0x0002,
    BenchmarkCommand = 0x0003,
    Sync = 0x0004,
    StartUnit = 0x0005,
    StopUnit = 0x0006,
    SecurityProtocolIn = 0x0007,
    SecurityProtocolOut = 0x0008,
    ScsiReset = 0x2284,
    DoorLock = 0x5380,
    DoorUnlock = 0x5381,
    GetIdLun = 0x5382,
    ProbeHost = 0x5385,
    GetBusNumber = 0x5386,
    GetPci = 0x5387,
}

impl IoctlOpcode {
    /// Decode a raw request code. `None` means the code is not part of the
    /// closed table and belongs to the host-specific handler.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0x0001 => Self::SendCommand,
            0x0002 => Self::TestUnitReady,
            0x0003 => Self::BenchmarkCommand,
            0x0004 => Self::Sync,
            0x0005 => Self::StartUnit,
            0x0006 => Self::StopUnit,
            0x0007 => Self::SecurityProtocolIn,
            0x0008 => Self::SecurityProtocolOut,
            0x2284 => Self::ScsiReset,
            0x5380 => Self::DoorLock,
            0x5381 => Self::DoorUnlock,
            0x5382 => Self::GetIdLun,
            0x5385 => Self::ProbeHost,
            0x5386 => Self::GetBusNumber,
            0x5387 => Self::GetPci,
            _ => return None,
        })
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Opcodes that predate the unique numbering scheme. Callers still
    /// using them get a diagnostic notice pointing at the passthrough
    /// interface before the request is served normally.
    #[inline]
    pub fn is_deprecated(self) -> bool {
        matches!(
            self,
            Self::SendCommand
                | Self::TestUnitReady
                | Self::BenchmarkCommand
                | Self::Sync
                | Self::StartUnit
                | Self::StopUnit
        )
    }
}

impl fmt::Display for IoctlOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SendCommand => "SEND_COMMAND",
            Self::TestUnitReady => "TEST_UNIT_READY",
            Self::BenchmarkCommand => "BENCHMARK_COMMAND",
            Self::Sync => "SYNC",
            Self::StartUnit => "START_UNIT",
            Self::StopUnit => "STOP_UNIT",
            Self::SecurityProtocolIn => "SECURITY_PROTOCOL_IN",
            Self::SecurityProtocolOut => "SECURITY_PROTOCOL_OUT",
            Self::ScsiReset => "SCSI_RESET",
            Self::DoorLock => "DOORLOCK",
            Self::DoorUnlock => "DOORUNLOCK",
            Self::GetIdLun => "GET_IDLUN",
            Self::ProbeHost => "PROBE_HOST",
            Self::GetBusNumber => "GET_BUS_NUMBER",
            Self::GetPci => "GET_PCI",
        })
    }
}

/// Returned when a caller insists on a typed opcode for a request code
/// outside the closed table.
#[derive(Debug, Error)]
#[error("unrecognized ioctl request code: {0:#06x}")]
pub struct UnknownIoctl(pub u32);

impl TryFrom<u32> for IoctlOpcode {
    type Error = UnknownIoctl;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(UnknownIoctl(raw))
    }
}
