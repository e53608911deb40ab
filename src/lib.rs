//! This crate provides the device-control (ioctl) dispatch layer for a
//! SCSI logical unit: opcode routing, buffer marshalling across the
//! caller trust boundary, command-block construction and sense-data
//! interpretation.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Handles configuration and logging.
pub mod cfg;
/// Builds fixed-layout SCSI command blocks (CDBs).
pub mod control_block;
/// Contains the dispatcher, executor, marshaller and sense interpreter.
pub mod dispatch;
/// Defines the data structures for devices, opcodes, sense data and the
/// caller boundary.
pub mod models;
/// Defines the command-transport collaborator interface.
pub mod transport;
