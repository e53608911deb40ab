// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The request envelope for variable-length protocol commands.
//!
//! SECURITY_PROTOCOL_IN/OUT callers hand over a fixed header of two
//! transfer lengths followed immediately by inline payload:
//!
//! ```text
//! +--------+--------+----------------------+
//! | inlen  | outlen | outlen bytes of data |  (to-device direction)
//! +--------+--------+----------------------+
//! | inlen  | outlen | inlen bytes written  |  (from-device direction)
//! +--------+--------+----------------------+
//! ```
//!
//! The header crosses the boundary as an in-memory ABI struct, so the
//! integers are native-endian, unlike the big-endian lengths inside the
//! command block itself.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{NativeEndian, U32},
};

/// Size of the envelope header preceding the inline data.
pub const SECURITY_HEADER_LEN: usize = core::mem::size_of::<SecurityIoctlHeader>();

/// Fixed header of a SECURITY_PROTOCOL_IN/OUT request envelope.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
pub struct SecurityIoctlHeader {
    /// Bytes the caller expects back from the device.
    pub inlen: U32<NativeEndian>,
    /// Bytes of inline payload the caller supplies for the device.
    pub outlen: U32<NativeEndian>,
}

impl SecurityIoctlHeader {
    pub fn new(inlen: u32, outlen: u32) -> Self {
        Self {
            inlen: U32::new(inlen),
            outlen: U32::new(outlen),
        }
    }
}
