//! This module defines the data structures for SCSI device control.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Defines the trust boundary over caller-supplied memory and the caller
/// privilege context.
pub mod boundary;
/// Defines the logical-unit handle, its mutable flags and host identity.
pub mod device;
/// Defines the request envelope for variable-length protocol commands.
pub mod envelope;
/// Defines the dispatch error taxonomy.
pub mod errors;
/// Defines the ioctl opcode table.
pub mod opcode;
/// Defines sense-data structures and descriptions.
pub mod sense_data;
