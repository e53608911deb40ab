// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, atomic::Ordering};

use anyhow::Result;
use scsi_ioctl_rs::{
    dispatch::{IOCTL_NORMAL_TIMEOUT, NORMAL_RETRIES, START_STOP_TIMEOUT, dispatcher::IoctlDispatcher},
    models::{
        boundary::CallerContext,
        envelope::{SECURITY_HEADER_LEN, SecurityIoctlHeader},
        errors::IoctlError,
        opcode::IoctlOpcode,
        sense_data::{SenseData, SenseKey},
    },
    transport::{DataDirection, ExecResult},
};
use zerocopy::IntoBytes;

use crate::unit_tests::common::{
    ECHO_HANDLER_RESULT, EchoHostHandler, IdleGate, MockTransport, RecoveringGate, fixed_device,
    removable_device,
};

fn dispatcher(transport: Arc<MockTransport>) -> IoctlDispatcher<MockTransport> {
    IoctlDispatcher::new(transport, Arc::new(IdleGate))
}

fn envelope(inlen: u32, outlen: u32, payload: &[u8]) -> Vec<u8> {
    let mut arg = vec![0u8; SECURITY_HEADER_LEN + payload.len()];
    arg[..SECURITY_HEADER_LEN]
        .copy_from_slice(SecurityIoctlHeader::new(inlen, outlen).as_bytes());
    arg[SECURITY_HEADER_LEN..].copy_from_slice(payload);
    arg
}

#[tokio::test]
async fn get_bus_number_writes_host_number() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    let ctx = CallerContext::default();

    let mut arg = vec![0u8; 4];
    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::GetBusNumber.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("dispatch failed: {e}"))?;

    assert_eq!(ret, 0);
    assert_eq!(arg, 3u32.to_ne_bytes());
    assert_eq!(transport.issued_count(), 0);
    Ok(())
}

#[tokio::test]
async fn get_idlun_packs_the_address() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport);
    let mut dev = fixed_device(); // channel 0, id 1, lun 2, host 3
    let ctx = CallerContext::default();

    let mut arg = vec![0u8; 8];
    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::GetIdLun.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("dispatch failed: {e}"))?;

    assert_eq!(ret, 0);
    assert_eq!(arg[..4], 0x0300_0201u32.to_ne_bytes());
    assert_eq!(arg[4..], 42u32.to_ne_bytes());
    Ok(())
}

#[tokio::test]
async fn send_command_requires_both_capabilities() {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();

    let mut arg = vec![0u8; 16];
    for ctx in [
        CallerContext::default(),
        CallerContext {
            sys_admin: true,
            ..Default::default()
        },
        CallerContext {
            sys_rawio: true,
            ..Default::default()
        },
    ] {
        let res = disp
            .dispatch(&mut dev, &ctx, IoctlOpcode::SendCommand.raw(), &mut arg[..])
            .await;
        assert!(matches!(res, Err(IoctlError::PermissionDenied)));
    }
    assert_eq!(transport.passthrough_calls.load(Ordering::SeqCst), 0);

    let res = disp
        .dispatch(
            &mut dev,
            &CallerContext::elevated(),
            IoctlOpcode::SendCommand.raw(),
            &mut arg[..],
        )
        .await;
    assert!(matches!(res, Ok(0)));
    assert_eq!(transport.passthrough_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn doorlock_is_idempotent() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = removable_device();
    let ctx = CallerContext::default();
    let mut arg: Vec<u8> = Vec::new();

    for _ in 0..2 {
        let ret = disp
            .dispatch(&mut dev, &ctx, IoctlOpcode::DoorLock.raw(), &mut arg[..])
            .await
            .map_err(|e| anyhow::anyhow!("doorlock failed: {e}"))?;
        assert_eq!(ret, 0);
        assert!(dev.is_locked());
    }

    let issued = transport.issued();
    assert_eq!(issued.len(), 2);
    for cmd in &issued {
        assert_eq!(cmd.cdb, [0x1E, 0, 0, 0, 1, 0]);
        assert_eq!(cmd.timeout, IOCTL_NORMAL_TIMEOUT);
        assert_eq!(cmd.retries, NORMAL_RETRIES);
    }

    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::DoorUnlock.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("doorunlock failed: {e}"))?;
    assert_eq!(ret, 0);
    assert!(!dev.is_locked());
    Ok(())
}

#[tokio::test]
async fn doorlock_on_fixed_media_issues_nothing() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::DoorLock.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("doorlock failed: {e}"))?;

    assert_eq!(ret, 0);
    assert!(!dev.is_locked());
    assert_eq!(transport.issued_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_doorlock_leaves_lock_state() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(ExecResult {
        result: 0x08,
        sense: None,
    });
    let disp = dispatcher(transport);
    let mut dev = removable_device();
    let mut arg: Vec<u8> = Vec::new();

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::DoorLock.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("doorlock failed: {e}"))?;

    assert_eq!(ret, 0x08);
    assert!(!dev.is_locked());
    Ok(())
}

#[tokio::test]
async fn test_unit_ready_uses_normal_budget() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::TestUnitReady.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("tur failed: {e}"))?;
    assert_eq!(ret, 0);

    let issued = transport.issued();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].cdb, [0u8; 6]);
    assert_eq!(issued[0].direction, DataDirection::None);
    assert_eq!(issued[0].timeout, IOCTL_NORMAL_TIMEOUT);
    assert_eq!(issued[0].retries, NORMAL_RETRIES);
    Ok(())
}

#[tokio::test]
async fn unit_attention_during_tur_is_downgraded() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    transport.push_response(ExecResult::check_condition(SenseData::new(
        SenseKey::UnitAttention,
        0x28,
        0x00,
    )));
    let disp = dispatcher(transport);
    let mut dev = removable_device();
    let mut arg: Vec<u8> = Vec::new();

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::TestUnitReady.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("tur failed: {e}"))?;

    assert_eq!(ret, 0);
    assert!(dev.media_changed());
    Ok(())
}

#[tokio::test]
async fn start_unit_builds_and_times_correctly() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    disp.dispatch(
        &mut dev,
        &CallerContext::default(),
        IoctlOpcode::StartUnit.raw(),
        &mut arg[..],
    )
    .await
    .map_err(|e| anyhow::anyhow!("start failed: {e}"))?;

    let issued = transport.issued();
    assert_eq!(issued[0].cdb, [0x1B, 0, 0, 0, 1, 0]);
    assert_eq!(issued[0].timeout, START_STOP_TIMEOUT);

    disp.dispatch(
        &mut dev,
        &CallerContext::default(),
        IoctlOpcode::StopUnit.raw(),
        &mut arg[..],
    )
    .await
    .map_err(|e| anyhow::anyhow!("stop failed: {e}"))?;

    assert_eq!(transport.issued()[1].cdb, [0x1B, 0, 0, 0, 0, 0]);
    Ok(())
}

#[tokio::test]
async fn security_out_oversize_rejected_before_execution() {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();

    // 20000 > the 16384 bound; no payload follows on purpose, validation
    // must fire before any boundary read or allocation.
    let mut arg = envelope(0, 20000, &[]);
    let res = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::SecurityProtocolOut.raw(),
            &mut arg[..],
        )
        .await;

    assert!(matches!(res, Err(IoctlError::InvalidArgument)));
    assert_eq!(transport.issued_count(), 0);
}

#[tokio::test]
async fn security_out_stages_payload() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();

    let payload = [0xDE, 0xAD, 0xBE, 0xEF];
    let mut arg = envelope(0, payload.len() as u32, &payload);

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::SecurityProtocolOut.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("security out failed: {e}"))?;
    assert_eq!(ret, 0);

    let issued = transport.issued();
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].direction, DataDirection::ToDevice);
    assert_eq!(issued[0].data, payload);
    assert_eq!(issued[0].timeout, START_STOP_TIMEOUT);
    assert_eq!(
        issued[0].cdb,
        [0xB5, 0xEC, 0x00, 0x01, 0, 0, 0, 0, 0, 4, 0, 0]
    );
    Ok(())
}

#[tokio::test]
async fn security_in_writes_device_data_after_header() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let fill = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    transport.set_inbound_data(fill.clone());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();

    let mut arg = envelope(fill.len() as u32, 0, &[0u8; 8]);
    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::SecurityProtocolIn.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("security in failed: {e}"))?;
    assert_eq!(ret, 0);

    assert_eq!(&arg[SECURITY_HEADER_LEN..], &fill[..]);

    let issued = transport.issued();
    assert_eq!(issued[0].direction, DataDirection::FromDevice);
    assert_eq!(
        issued[0].cdb,
        [0xA2, 0xEC, 0x00, 0x01, 0, 0, 0, 0, 0, 8, 0, 0]
    );
    // The security path never touches device flags.
    assert!(!dev.media_changed());
    Ok(())
}

#[tokio::test]
async fn unrecognized_opcode_without_handler_is_unsupported() {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport);
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    let res = disp
        .dispatch(&mut dev, &CallerContext::default(), 0xBEEF, &mut arg[..])
        .await;
    assert!(matches!(res, Err(IoctlError::NotSupported(0xBEEF))));
}

#[tokio::test]
async fn unrecognized_opcode_reaches_host_handler() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport).with_host_handler(Arc::new(EchoHostHandler));
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    let ret = disp
        .dispatch(&mut dev, &CallerContext::default(), 0xBEEF, &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("fallback failed: {e}"))?;
    assert_eq!(ret, ECHO_HANDLER_RESULT);
    Ok(())
}

#[tokio::test]
async fn reset_is_rejected_for_excluded_driver_family() {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    dev.host.name = "ufshcd0".to_string();
    let mut arg = vec![0u8; 4];

    let res = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::ScsiReset.raw(),
            &mut arg[..],
        )
        .await;

    assert!(matches!(res, Err(IoctlError::InvalidArgument)));
    assert_eq!(transport.reset_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reset_delegates_to_transport() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport.clone());
    let mut dev = fixed_device();
    let mut arg = vec![0u8; 4];

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::ScsiReset.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("reset failed: {e}"))?;
    assert_eq!(ret, 0);
    assert_eq!(transport.reset_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn recovery_failure_reports_no_such_device() {
    let transport = Arc::new(MockTransport::new());
    let disp = IoctlDispatcher::new(
        transport.clone(),
        Arc::new(RecoveringGate {
            usable_after_wait: false,
        }),
    );
    let mut dev = fixed_device();
    let mut arg: Vec<u8> = Vec::new();

    let res = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::TestUnitReady.raw(),
            &mut arg[..],
        )
        .await;

    assert!(matches!(res, Err(IoctlError::NoSuchDevice)));
    assert_eq!(transport.issued_count(), 0);
}

#[tokio::test]
async fn nonblocking_reset_during_recovery_is_busy() {
    let transport = Arc::new(MockTransport::new());
    let disp = IoctlDispatcher::new(
        transport.clone(),
        Arc::new(RecoveringGate {
            usable_after_wait: true,
        }),
    );
    let mut dev = fixed_device();
    let mut arg = vec![0u8; 4];
    let ctx = CallerContext {
        nonblocking: true,
        ..Default::default()
    };

    let res = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::ScsiReset.raw(), &mut arg[..])
        .await;

    assert!(matches!(res, Err(IoctlError::DeviceBusy)));
    assert_eq!(transport.reset_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blocking_reset_waits_out_recovery() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = IoctlDispatcher::new(
        transport.clone(),
        Arc::new(RecoveringGate {
            usable_after_wait: true,
        }),
    );
    let mut dev = fixed_device();
    let mut arg = vec![0u8; 4];

    let ret = disp
        .dispatch(
            &mut dev,
            &CallerContext::default(),
            IoctlOpcode::ScsiReset.raw(),
            &mut arg[..],
        )
        .await
        .map_err(|e| anyhow::anyhow!("reset failed: {e}"))?;
    assert_eq!(ret, 0);
    assert_eq!(transport.reset_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn probe_host_reports_identification() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport);
    let mut dev = fixed_device(); // info = "Mock HBA rev 1.0", 16 bytes
    let ctx = CallerContext::default();

    let mut arg = vec![0u8; 20];
    arg[..4].copy_from_slice(&17u32.to_ne_bytes());
    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::ProbeHost.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("probe failed: {e}"))?;

    assert_eq!(ret, 1);
    assert_eq!(arg[..16], *b"Mock HBA rev 1.0");
    assert_eq!(arg[16], 0); // NUL rides along, there was room

    // A shorter request gets a clamped, unterminated prefix.
    let mut arg = vec![0u8; 20];
    arg[..4].copy_from_slice(&4u32.to_ne_bytes());
    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::ProbeHost.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("probe failed: {e}"))?;

    assert_eq!(ret, 1);
    assert_eq!(arg[..4], *b"Mock");
    assert_eq!(arg[4..], [0u8; 16]);
    Ok(())
}

#[tokio::test]
async fn get_pci_writes_slot_name_or_fails() -> Result<()> {
    let transport = Arc::new(MockTransport::new());
    let disp = dispatcher(transport);
    let ctx = CallerContext::default();

    let mut dev = fixed_device(); // pci_name = "0000:00:1f.2"
    let mut arg = vec![0u8; 20];
    let ret = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::GetPci.raw(), &mut arg[..])
        .await
        .map_err(|e| anyhow::anyhow!("get_pci failed: {e}"))?;
    assert_eq!(ret, 0);
    assert_eq!(arg[..12], *b"0000:00:1f.2");

    let mut dev = fixed_device();
    dev.host.pci_name = None;
    let res = disp
        .dispatch(&mut dev, &ctx, IoctlOpcode::GetPci.raw(), &mut arg[..])
        .await;
    assert!(matches!(res, Err(IoctlError::NoSuchDevice)));
    Ok(())
}
