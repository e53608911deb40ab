// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The low-level command transport this core issues commands through.
//!
//! Execution, DMA and the retry mechanics all belong to the transport;
//! the dispatch layer only supplies the command block, the direction, a
//! device-local buffer and the timeout/retry budget, then interprets the
//! completion. One command is in flight per call; there is no abort path.

use std::{future::Future, time::Duration};

use thiserror::Error;

use crate::models::{boundary::BoundaryBuffer, device::DeviceIdentity, sense_data::SenseData};

/// Transfer direction of a command's data phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataDirection {
    /// No data phase.
    #[default]
    None,
    /// The buffer is written to the device.
    ToDevice,
    /// The device fills the buffer.
    FromDevice,
}

/// Raw result value for a CHECK CONDITION completion (SAM status byte).
pub const CHECK_CONDITION: i32 = 0x02;

/// Completion of one command: the raw result word plus sense data when
/// the result is a check condition. Flag side effects are the caller's
/// business, never the transport's.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// 0 = good; anything else is interpreted against the sense data.
    pub result: i32,
    /// Present exactly when the device returned valid sense.
    pub sense: Option<SenseData>,
}

impl ExecResult {
    /// A clean completion.
    pub fn good() -> Self {
        Self::default()
    }

    /// A CHECK CONDITION completion carrying sense data.
    pub fn check_condition(sense: SenseData) -> Self {
        Self {
            result: CHECK_CONDITION,
            sense: Some(sense),
        }
    }
}

/// The transport failed to run the command at all. Distinct from a
/// command that ran and reported bad status, which comes back through
/// [`ExecResult`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("device went offline")]
    Offline,
    #[error("transport i/o failure: {0}")]
    Io(String),
}

/// Synchronous command execution against one logical unit.
///
/// "Synchronous" means the returned future resolves only once the
/// command has completed, failed or exhausted its budget; the dispatch
/// layer awaits it with no internal concurrency.
pub trait CommandTransport: Send + Sync {
    /// Issue a fixed-format command block and await its completion.
    ///
    /// `retries` is the transient-failure budget the transport may spend
    /// per its own policy; `timeout` bounds each attempt.
    fn execute(
        &self,
        target: &DeviceIdentity,
        cdb: &[u8],
        direction: DataDirection,
        data: &mut [u8],
        timeout: Duration,
        retries: u32,
    ) -> impl Future<Output = Result<ExecResult, TransportError>> + Send;

    /// The generic block-layer passthrough SEND_COMMAND delegates to.
    /// The caller buffer is handed over untouched.
    fn passthrough(
        &self,
        target: &DeviceIdentity,
        arg: &mut dyn BoundaryBuffer,
    ) -> impl Future<Output = Result<i32, TransportError>> + Send;

    /// The reset path SCSI_RESET delegates to; the reset-kind word in the
    /// caller buffer belongs to this collaborator.
    fn reset(
        &self,
        target: &DeviceIdentity,
        arg: &mut dyn BoundaryBuffer,
    ) -> impl Future<Output = Result<i32, TransportError>> + Send;
}
