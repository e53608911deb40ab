// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Synchronous execution of internal commands over the transport.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    dispatch::sense,
    models::{device::ScsiDevice, errors::IoctlError},
    transport::{CommandTransport, DataDirection},
};

/// Issue a no-data internal command and run the completion through the
/// sense interpreter. Returns the adjusted result.
pub async fn execute_internal<T: CommandTransport>(
    transport: &T,
    dev: &mut ScsiDevice,
    cdb: &[u8],
    timeout: Duration,
    retries: u32,
) -> Result<i32, IoctlError> {
    debug!(cdb = %hex::encode(cdb), "issuing internal scsi command");

    let completion = transport
        .execute(&dev.identity, cdb, DataDirection::None, &mut [], timeout, retries)
        .await?;

    debug!(result = completion.result, "internal scsi command returned");

    Ok(sense::interpret(
        dev,
        cdb,
        completion.result,
        completion.sense.as_ref(),
    ))
}

/// Issue a command with a data phase, for the security-protocol path.
///
/// Sense conditions on this path are logged but never mutate device
/// flags, and the result is returned unchanged.
pub async fn execute_with_buffer<T: CommandTransport>(
    transport: &T,
    dev: &mut ScsiDevice,
    cdb: &[u8],
    direction: DataDirection,
    data: &mut [u8],
    timeout: Duration,
    retries: u32,
) -> Result<i32, IoctlError> {
    debug!(cdb = %hex::encode(cdb), ?direction, len = data.len(), "issuing scsi command with data phase");

    let completion = transport
        .execute(&dev.identity, cdb, direction, data, timeout, retries)
        .await?;

    if let Some(sense) = &completion.sense {
        warn!(
            result = completion.result,
            %sense,
            "security protocol command reported sense"
        );
    }

    Ok(completion.result)
}
