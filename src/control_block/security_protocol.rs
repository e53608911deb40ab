// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SECURITY PROTOCOL IN/OUT(12) command blocks.
//!
//! Byte layout per SPC-4 § 6.30/6.31, with the protocol fields fixed to
//! the UFS RPMB well-known values:
//!
//! ```text
//! byte 0      operation code (0xA2 in / 0xB5 out)
//! byte 1      SECURITY PROTOCOL        = 0xEC (UFS)
//! bytes 2-3   SECURITY PROTOCOL SPECIFIC, big-endian = 0x0001
//! bytes 4-5   reserved
//! bytes 6-9   ALLOCATION/TRANSFER LENGTH, big-endian (byte 6 = MSB)
//! bytes 10-11 reserved
//! ```

/// SECURITY PROTOCOL IN(12) operation code.
pub const SECURITY_PROTOCOL_IN: u8 = 0xA2;
/// SECURITY PROTOCOL OUT(12) operation code.
pub const SECURITY_PROTOCOL_OUT: u8 = 0xB5;

/// SECURITY PROTOCOL field value for UFS devices.
pub const SECURITY_PROTOCOL_UFS: u8 = 0xEC;
/// SECURITY PROTOCOL SPECIFIC value selecting RPMB certified data.
pub const SECURITY_PROTOCOL_SPECIFIC_CERT_DATA: u16 = 0x0001;

/// CDB length for SECURITY PROTOCOL IN/OUT(12).
pub const SECURITY_PROTOCOL_CDB_LEN: usize = 12;

/// Build a SECURITY PROTOCOL IN(12) CDB expecting `len` bytes back.
#[inline]
pub fn build_security_protocol_in(cdb: &mut [u8; SECURITY_PROTOCOL_CDB_LEN], len: u32) {
    build_security_protocol(cdb, SECURITY_PROTOCOL_IN, len);
}

/// Build a SECURITY PROTOCOL OUT(12) CDB carrying `len` bytes of payload.
#[inline]
pub fn build_security_protocol_out(cdb: &mut [u8; SECURITY_PROTOCOL_CDB_LEN], len: u32) {
    build_security_protocol(cdb, SECURITY_PROTOCOL_OUT, len);
}

fn build_security_protocol(cdb: &mut [u8; SECURITY_PROTOCOL_CDB_LEN], opcode: u8, len: u32) {
    cdb.fill(0);
    cdb[0] = opcode;
    cdb[1] = SECURITY_PROTOCOL_UFS;
    cdb[2..4].copy_from_slice(&SECURITY_PROTOCOL_SPECIFIC_CERT_DATA.to_be_bytes());
    cdb[6..10].copy_from_slice(&len.to_be_bytes()); // byte 6 = MSB
}
