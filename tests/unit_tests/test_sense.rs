// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use scsi_ioctl_rs::{
    control_block::medium_removal::{MEDIUM_REMOVAL_CDB_LEN, build_medium_removal},
    dispatch::sense::interpret,
    models::sense_data::{FIXED_MIN_LEN, SenseData, SenseKey},
    transport::CHECK_CONDITION,
};

use crate::unit_tests::common::{fixed_device, removable_device};

fn fixed_format_sense(key: u8, asc: u8, ascq: u8) -> [u8; FIXED_MIN_LEN] {
    let mut raw = [0u8; FIXED_MIN_LEN];
    raw[0] = 0x70; // current, fixed format
    raw[2] = key;
    raw[7] = 0x0A; // additional length
    raw[12] = asc;
    raw[13] = ascq;
    raw
}

#[test]
fn parse_fixed_format() -> Result<()> {
    let raw = fixed_format_sense(0x06, 0x28, 0x00);
    let sense = SenseData::parse(&raw)?;

    assert_eq!(sense.response_code, 0x70);
    assert_eq!(sense.sense_key, SenseKey::UnitAttention);
    assert_eq!(sense.asc, 0x28);
    assert_eq!(sense.ascq, 0x00);
    assert!(!sense.is_deferred());
    Ok(())
}

#[test]
fn parse_rejects_short_buffer() {
    assert!(SenseData::parse(&[0u8; FIXED_MIN_LEN - 1]).is_err());
}

#[test]
fn unit_attention_on_removable_overrides_result() {
    let mut dev = removable_device();
    let sense = SenseData::new(SenseKey::UnitAttention, 0x28, 0x00);

    // Any raw result collapses to success once the media change is
    // recorded.
    for raw in [CHECK_CONDITION, 0x0800_0002] {
        dev.set_media_changed(false);
        let adjusted = interpret(&mut dev, &[0u8; 6], raw, Some(&sense));
        assert_eq!(adjusted, 0);
        assert!(dev.media_changed());
    }
}

#[test]
fn unit_attention_on_fixed_media_passes_through() {
    let mut dev = fixed_device();
    let sense = SenseData::new(SenseKey::UnitAttention, 0x29, 0x00);

    let adjusted = interpret(&mut dev, &[0u8; 6], CHECK_CONDITION, Some(&sense));
    assert_eq!(adjusted, CHECK_CONDITION);
    assert!(!dev.media_changed());
}

#[test]
fn not_ready_on_removable_is_silent() {
    let mut dev = removable_device();
    let sense = SenseData::new(SenseKey::NotReady, 0x3A, 0x00);

    let adjusted = interpret(&mut dev, &[0u8; 6], CHECK_CONDITION, Some(&sense));
    assert_eq!(adjusted, CHECK_CONDITION);
    assert!(!dev.media_changed());
}

#[test]
fn not_ready_on_fixed_media_passes_through() {
    let mut dev = fixed_device();
    let sense = SenseData::new(SenseKey::NotReady, 0x04, 0x01);

    let adjusted = interpret(&mut dev, &[0u8; 6], CHECK_CONDITION, Some(&sense));
    assert_eq!(adjusted, CHECK_CONDITION);
}

#[test]
fn illegal_request_on_medium_removal_clears_lockable() {
    let mut dev = removable_device();
    assert!(dev.is_lockable());

    let mut cdb = [0u8; MEDIUM_REMOVAL_CDB_LEN];
    build_medium_removal(&mut cdb, true);
    let sense = SenseData::new(SenseKey::IllegalRequest, 0x20, 0x00);

    let adjusted = interpret(&mut dev, &cdb, CHECK_CONDITION, Some(&sense));
    assert_eq!(adjusted, CHECK_CONDITION);
    assert!(!dev.is_lockable());
}

#[test]
fn illegal_request_on_other_command_keeps_lockable() {
    let mut dev = removable_device();
    let sense = SenseData::new(SenseKey::IllegalRequest, 0x24, 0x00);

    let adjusted = interpret(&mut dev, &[0x1B, 0, 0, 0, 1, 0], CHECK_CONDITION, Some(&sense));
    assert_eq!(adjusted, CHECK_CONDITION);
    assert!(dev.is_lockable());
}

#[test]
fn no_sense_passes_result_through() {
    let mut dev = removable_device();
    let adjusted = interpret(&mut dev, &[0u8; 6], 0, None);
    assert_eq!(adjusted, 0);
    assert!(!dev.media_changed());
    assert!(dev.is_lockable());
}
