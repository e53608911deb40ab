// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Classification of a completed internal command's sense data.
//!
//! This is the only place where command execution feeds back into the
//! device's `MEDIA_CHANGED` and `LOCKABLE` flags.

use tracing::warn;

use crate::{
    control_block::medium_removal::ALLOW_MEDIUM_REMOVAL,
    models::{
        device::ScsiDevice,
        sense_data::{SenseData, SenseKey},
    },
};

/// Interpret a completion and return the adjusted result.
///
/// * `IllegalRequest` on a medium-removal command clears the device's
///   `LOCKABLE` capability; on anything else it is logged.
/// * `NotReady` on removable media is the no-medium case and stays
///   silent; on fixed media it falls through to default handling.
/// * `UnitAttention` on removable media records a media change and
///   overrides the result to success: the notification itself is not an
///   error the caller needs to see. Fixed media falls through.
/// * Everything else is logged with the decoded sense and passed through
///   unchanged.
pub fn interpret(
    dev: &mut ScsiDevice,
    cdb: &[u8],
    result: i32,
    sense: Option<&SenseData>,
) -> i32 {
    let Some(sense) = sense else {
        return result;
    };

    match sense.sense_key {
        SenseKey::IllegalRequest => {
            if cdb.first() == Some(&ALLOW_MEDIUM_REMOVAL) {
                dev.clear_lockable();
            } else {
                warn!(
                    asc = sense.asc,
                    ascq = sense.ascq,
                    "internal command rejected: illegal request"
                );
            }
            result
        }
        SenseKey::NotReady if dev.is_removable() => result, // no medium in the drive
        SenseKey::UnitAttention if dev.is_removable() => {
            dev.set_media_changed(true);
            0
        }
        _ => {
            warn!(result, %sense, "internal command completed with sense");
            result
        }
    }
}
