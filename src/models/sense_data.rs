// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use anyhow::{Result, anyhow};

/// Fixed-format sense data is at least 18 bytes.
pub const FIXED_MIN_LEN: usize = 18;

/// SPC sense-key nibble (byte 2, bits 3:0 of fixed-format sense data).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenseKey {
    #[default]
    NoSense = 0x0,
    RecoveredError = 0x1,
    NotReady = 0x2,
    MediumError = 0x3,
    HardwareError = 0x4,
    IllegalRequest = 0x5,
    UnitAttention = 0x6,
    DataProtect = 0x7,
    BlankCheck = 0x8,
    VendorSpecific = 0x9,
    CopyAborted = 0xA,
    AbortedCommand = 0xB,
    Equal = 0xC,
    VolumeOverflow = 0xD,
    Miscompare = 0xE,
    Completed = 0xF,
}

impl SenseKey {
    /// Total decoder over the low nibble; every value is defined by SPC.
    #[inline]
    pub fn from_nibble(v: u8) -> Self {
        match v & 0x0F {
            0x0 => Self::NoSense,
            0x1 => Self::RecoveredError,
            0x2 => Self::NotReady,
            0x3 => Self::MediumError,
            0x4 => Self::HardwareError,
            0x5 => Self::IllegalRequest,
            0x6 => Self::UnitAttention,
            0x7 => Self::DataProtect,
            0x8 => Self::BlankCheck,
            0x9 => Self::VendorSpecific,
            0xA => Self::CopyAborted,
            0xB => Self::AbortedCommand,
            0xC => Self::Equal,
            0xD => Self::VolumeOverflow,
            0xE => Self::Miscompare,
            _ => Self::Completed,
        }
    }
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoSense => "No Sense",
            Self::RecoveredError => "Recovered Error",
            Self::NotReady => "Not Ready",
            Self::MediumError => "Medium Error",
            Self::HardwareError => "Hardware Error",
            Self::IllegalRequest => "Illegal Request",
            Self::UnitAttention => "Unit Attention",
            Self::DataProtect => "Data Protect",
            Self::BlankCheck => "Blank Check",
            Self::VendorSpecific => "Vendor Specific",
            Self::CopyAborted => "Copy Aborted",
            Self::AbortedCommand => "Aborted Command",
            Self::Equal => "Equal",
            Self::VolumeOverflow => "Volume Overflow",
            Self::Miscompare => "Miscompare",
            Self::Completed => "Completed",
        })
    }
}

/// The diagnostic record a device returns alongside a CHECK CONDITION.
///
/// Only the fields the dispatch core consumes are kept: the response code
/// (current vs deferred errors), the sense key, and the additional sense
/// code pair that names the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SenseData {
    /// Low 7 bits of byte 0; 0x70 = current, 0x71 = deferred.
    pub response_code: u8,
    pub sense_key: SenseKey,
    pub asc: u8,
    pub ascq: u8,
}

impl SenseData {
    pub fn new(sense_key: SenseKey, asc: u8, ascq: u8) -> Self {
        Self {
            response_code: 0x70,
            sense_key,
            asc,
            ascq,
        }
    }

    /// Parse fixed-format sense data (SPC-4 § 4.5.3). The buffer must be
    /// at least [`FIXED_MIN_LEN`] bytes.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < FIXED_MIN_LEN {
            return Err(anyhow!(
                "sense buffer too small: {} < {FIXED_MIN_LEN}",
                buf.len()
            ));
        }

        Ok(Self {
            response_code: buf[0] & 0x7F,
            sense_key: SenseKey::from_nibble(buf[2]),
            asc: buf[12],
            ascq: buf[13],
        })
    }

    /// Deferred errors report a condition from an earlier command.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.response_code == 0x71
    }
}

impl fmt::Display for SenseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] asc=0x{:02x} ascq=0x{:02x} ({})",
            self.sense_key,
            if self.is_deferred() {
                "deferred"
            } else {
                "current"
            },
            self.asc,
            self.ascq,
            asc_ascq_to_str(self.asc, self.ascq)
        )
    }
}

/// Return the SPC description for an ASC/ASCQ pair, or a vendor-specific
/// placeholder when the pair is not in the table.
#[inline]
pub fn asc_ascq_to_str(asc: u8, ascq: u8) -> &'static str {
    hot_table(asc, ascq).unwrap_or("UNSPECIFIED / vendor specific")
}

fn hot_table(asc: u8, ascq: u8) -> Option<&'static str> {
    Some(match (asc, ascq) {
        (0x00, 0x00) => "No additional sense information",
        (0x04, 0x01) => "Logical unit is in process of becoming ready",
        (0x04, 0x02) => "Logical unit not ready, initializing command required",
        (0x20, 0x00) => "Illegal request – invalid command operation code",
        (0x24, 0x00) => "Illegal request – invalid field in CDB",
        (0x25, 0x00) => "Illegal request – logical unit not supported",
        (0x28, 0x00) => "Not ready to ready change, medium may have changed",
        (0x29, 0x00) => "Power on, reset, or bus device reset occurred",
        (0x3A, 0x00) => "Medium not present",
        (0x53, 0x02) => "Medium removal prevented",
        _ => return None,
    })
}
