// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The top-level ioctl entry point: opcode routing, capability checks,
//! recovery gating and the host-specific fallback.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use tracing::warn;

use crate::{
    cfg::config::Config,
    control_block::{
        medium_removal::{MEDIUM_REMOVAL_CDB_LEN, RemovalState, build_medium_removal},
        security_protocol::{
            SECURITY_PROTOCOL_CDB_LEN, build_security_protocol_in, build_security_protocol_out,
        },
        start_stop::{START_STOP_CDB_LEN, build_start_stop},
        test_unit_ready::{TEST_UNIT_READY_CDB_LEN, build_test_unit_ready},
    },
    dispatch::{executor, marshal},
    models::{
        boundary::{BoundaryBuffer, BoundaryFault, CallerContext},
        device::{DeviceIdentity, ScsiDevice},
        errors::IoctlError,
        opcode::IoctlOpcode,
    },
    transport::{CommandTransport, DataDirection},
};

/// GET_PCI reports at most this many bytes of the bus-slot name, for
/// compatibility with the original fixed-size interface.
const PCI_NAME_MAX: usize = 20;

/// Driver family whose devices reject SCSI_RESET outright.
const RESET_EXCLUDED_FAMILY: &str = "ufshcd";

/// Error-recovery gating, delegated to the surrounding EH subsystem.
pub trait RecoveryGate: Send + Sync {
    /// Non-blocking query: is the host mid-recovery right now?
    fn host_in_recovery(&self) -> bool;

    /// Block until the device can process commands again. `false` means
    /// recovery gave up and the device is no longer usable.
    fn wait_until_processable<'a>(
        &'a self,
        target: &'a DeviceIdentity,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// Host-specific fallback for request codes outside the closed table.
pub trait HostIoctlHandler: Send + Sync {
    fn handle(
        &self,
        dev: &mut ScsiDevice,
        opcode: u32,
        arg: &mut dyn BoundaryBuffer,
    ) -> Result<i32, IoctlError>;
}

/// Routes device-control requests for one logical unit at a time.
///
/// Holds the command transport, the recovery gate, an optional
/// host-specific fallback and the timeout/retry policy. The dispatcher
/// itself is stateless across calls apart from the deprecation-notice
/// counter; serializing concurrent calls on the same device handle is
/// the caller's business.
pub struct IoctlDispatcher<T> {
    transport: Arc<T>,
    recovery: Arc<dyn RecoveryGate>,
    host_handler: Option<Arc<dyn HostIoctlHandler>>,
    config: Config,
    deprecation_notices: AtomicU32,
}

impl<T: CommandTransport> IoctlDispatcher<T> {
    pub fn new(transport: Arc<T>, recovery: Arc<dyn RecoveryGate>) -> Self {
        Self {
            transport,
            recovery,
            host_handler: None,
            config: Config::default(),
            deprecation_notices: AtomicU32::new(0),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_host_handler(mut self, handler: Arc<dyn HostIoctlHandler>) -> Self {
        self.host_handler = Some(handler);
        self
    }

    /// Dispatch one device-control request.
    ///
    /// Returns `Ok(0)` on success, `Ok(n > 0)` when the device reported a
    /// status the sense interpreter chose to pass through, and `Err` for
    /// everything in the validation/permission/transport taxonomy.
    pub async fn dispatch(
        &self,
        dev: &mut ScsiDevice,
        ctx: &CallerContext,
        opcode: u32,
        arg: &mut (impl BoundaryBuffer + ?Sized),
    ) -> Result<i32, IoctlError> {
        // Bridge a possibly-unsized caller buffer (e.g. a bare `[u8]`
        // slice) to the `&mut dyn BoundaryBuffer` the internal routing and
        // the trait-object collaborators (`HostIoctlHandler`, transport)
        // expect. Pure forwarding, no change in behaviour.
        let mut bridge = DynArg(arg);
        let arg: &mut dyn BoundaryBuffer = &mut bridge;

        self.check_processing_errors(dev, opcode, ctx.nonblocking)
            .await?;

        let known = IoctlOpcode::from_raw(opcode);
        if let Some(op) = known {
            if op.is_deprecated() {
                self.note_deprecated(op);
            }
        }

        match known {
            Some(IoctlOpcode::GetIdLun) => {
                let mut out = [0u8; 8];
                out[..4].copy_from_slice(&dev.composite_id().to_ne_bytes());
                out[4..].copy_from_slice(&dev.host.unique_id.to_ne_bytes());
                arg.write(0, &out)?;
                Ok(0)
            }
            Some(IoctlOpcode::GetBusNumber) => {
                arg.write(0, &dev.host.host_no.to_ne_bytes())?;
                Ok(0)
            }
            Some(IoctlOpcode::ProbeHost) => self.probe_host(dev, arg),
            Some(IoctlOpcode::SendCommand) => {
                if !ctx.sys_admin || !ctx.sys_rawio {
                    return Err(IoctlError::PermissionDenied);
                }
                Ok(self.transport.passthrough(&dev.identity, arg).await?)
            }
            Some(IoctlOpcode::DoorLock) => {
                self.set_medium_removal(dev, RemovalState::Prevent).await
            }
            Some(IoctlOpcode::DoorUnlock) => {
                self.set_medium_removal(dev, RemovalState::Allow).await
            }
            Some(IoctlOpcode::TestUnitReady) => self.test_unit_ready(dev).await,
            Some(IoctlOpcode::StartUnit) => self.start_stop_unit(dev, true).await,
            Some(IoctlOpcode::StopUnit) => self.start_stop_unit(dev, false).await,
            Some(IoctlOpcode::SecurityProtocolIn) => {
                self.security_protocol(dev, DataDirection::FromDevice, arg)
                    .await
            }
            Some(IoctlOpcode::SecurityProtocolOut) => {
                self.security_protocol(dev, DataDirection::ToDevice, arg)
                    .await
            }
            Some(IoctlOpcode::GetPci) => self.get_pci(dev, arg),
            Some(IoctlOpcode::ScsiReset) => {
                if dev.host.name.starts_with(RESET_EXCLUDED_FAMILY) {
                    return Err(IoctlError::InvalidArgument);
                }
                Ok(self.transport.reset(&dev.identity, arg).await?)
            }
            Some(IoctlOpcode::BenchmarkCommand) | Some(IoctlOpcode::Sync) | None => {
                self.host_fallback(dev, opcode, arg)
            }
        }
    }

    /// Gate a request on the error-recovery state.
    ///
    /// A reset from a non-blocking caller is the one request allowed to
    /// probe recovery without waiting: it fails fast with `DeviceBusy`.
    /// Everything else blocks until the device is processable again and
    /// fails with `NoSuchDevice` when recovery gave the device up.
    pub async fn check_processing_errors(
        &self,
        dev: &ScsiDevice,
        opcode: u32,
        nonblocking: bool,
    ) -> Result<(), IoctlError> {
        if opcode == IoctlOpcode::ScsiReset.raw() && nonblocking {
            if self.recovery.host_in_recovery() {
                return Err(IoctlError::DeviceBusy);
            }
            return Ok(());
        }

        if !self.recovery.wait_until_processable(&dev.identity).await {
            return Err(IoctlError::NoSuchDevice);
        }

        Ok(())
    }

    /// Lock or release the medium door.
    ///
    /// A no-op success on devices that are not removable or not lockable.
    /// The `LOCKED` flag tracks the last successful state change, so
    /// repeated locks are idempotent.
    pub async fn set_medium_removal(
        &self,
        dev: &mut ScsiDevice,
        state: RemovalState,
    ) -> Result<i32, IoctlError> {
        if !dev.is_removable() || !dev.is_lockable() {
            return Ok(0);
        }

        let mut cdb = [0u8; MEDIUM_REMOVAL_CDB_LEN];
        build_medium_removal(&mut cdb, state.prevents());

        let result = executor::execute_internal(
            self.transport.as_ref(),
            dev,
            &cdb,
            self.config.execution.normal_timeout,
            self.config.execution.normal_retries,
        )
        .await?;

        if result == 0 {
            dev.set_locked(state.prevents());
        }
        Ok(result)
    }

    async fn test_unit_ready(&self, dev: &mut ScsiDevice) -> Result<i32, IoctlError> {
        let mut cdb = [0u8; TEST_UNIT_READY_CDB_LEN];
        build_test_unit_ready(&mut cdb);

        executor::execute_internal(
            self.transport.as_ref(),
            dev,
            &cdb,
            self.config.execution.normal_timeout,
            self.config.execution.normal_retries,
        )
        .await
    }

    async fn start_stop_unit(&self, dev: &mut ScsiDevice, start: bool) -> Result<i32, IoctlError> {
        let mut cdb = [0u8; START_STOP_CDB_LEN];
        build_start_stop(&mut cdb, start);

        executor::execute_internal(
            self.transport.as_ref(),
            dev,
            &cdb,
            self.config.execution.start_stop_timeout,
            self.config.execution.normal_retries,
        )
        .await
    }

    /// Marshal, execute and complete a variable-length security-protocol
    /// transfer. Response data is written back to the caller right after
    /// the envelope header, whatever the command's own status was.
    async fn security_protocol(
        &self,
        dev: &mut ScsiDevice,
        direction: DataDirection,
        arg: &mut dyn BoundaryBuffer,
    ) -> Result<i32, IoctlError> {
        let header = marshal::read_security_header(arg)?;
        let max = self.config.limits.max_transfer;

        let mut cdb = [0u8; SECURITY_PROTOCOL_CDB_LEN];
        let (len, mut buf) = match direction {
            DataDirection::FromDevice => {
                let len = header.inlen.get() as usize;
                let buf = marshal::ScratchBuffer::zeroed(len, max)?;
                build_security_protocol_in(&mut cdb, len as u32);
                (len, buf)
            }
            DataDirection::ToDevice => {
                let len = header.outlen.get() as usize;
                let buf = marshal::stage_out_data(arg, len, max)?;
                build_security_protocol_out(&mut cdb, len as u32);
                (len, buf)
            }
            DataDirection::None => {
                warn!("security protocol request without a transfer direction");
                return Err(IoctlError::InvalidArgument);
            }
        };

        let result = executor::execute_with_buffer(
            self.transport.as_ref(),
            dev,
            &cdb,
            direction,
            buf.as_mut_slice(),
            self.config.execution.start_stop_timeout,
            self.config.execution.normal_retries,
        )
        .await?;

        if direction == DataDirection::FromDevice {
            marshal::write_in_data(arg, &buf, len)?;
        }

        Ok(result)
    }

    /// Report the host identification string, clamped to the length the
    /// caller asked for (the trailing NUL rides along only when there is
    /// room). An empty caller buffer means no buffer at all.
    fn probe_host(
        &self,
        dev: &ScsiDevice,
        arg: &mut dyn BoundaryBuffer,
    ) -> Result<i32, IoctlError> {
        if arg.is_empty() {
            return Ok(1);
        }

        let mut raw = [0u8; 4];
        arg.read(0, &mut raw)?;
        let wanted = u32::from_ne_bytes(raw) as usize;

        let mut ident = dev.host.identification().as_bytes().to_vec();
        ident.push(0);

        let n = wanted.min(ident.len());
        arg.write(0, &ident[..n])?;
        Ok(1)
    }

    fn get_pci(&self, dev: &ScsiDevice, arg: &mut dyn BoundaryBuffer) -> Result<i32, IoctlError> {
        let name = dev
            .host
            .pci_name
            .as_deref()
            .ok_or(IoctlError::NoSuchDevice)?;

        let bytes = name.as_bytes();
        let n = bytes.len().min(PCI_NAME_MAX);
        arg.write(0, &bytes[..n])?;
        Ok(0)
    }

    fn host_fallback(
        &self,
        dev: &mut ScsiDevice,
        opcode: u32,
        arg: &mut dyn BoundaryBuffer,
    ) -> Result<i32, IoctlError> {
        match &self.host_handler {
            Some(handler) => handler.handle(dev, opcode, arg),
            None => Err(IoctlError::NotSupported(opcode)),
        }
    }

    /// One diagnostic per dispatcher instance, keyed by the call count,
    /// pointing retired opcodes at the passthrough interface.
    fn note_deprecated(&self, op: IoctlOpcode) {
        if self.deprecation_notices.fetch_add(1, Ordering::Relaxed) == 0 {
            warn!(
                opcode = %op,
                "caller is using a deprecated scsi ioctl, convert it to the block-layer passthrough"
            );
        }
    }
}

/// Sized adapter that lets a possibly-unsized `BoundaryBuffer` be handed
/// out as a `&mut dyn BoundaryBuffer`. Every call forwards verbatim.
struct DynArg<'a, B: BoundaryBuffer + ?Sized>(&'a mut B);

impl<B: BoundaryBuffer + ?Sized> BoundaryBuffer for DynArg<'_, B> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn read(&self, offset: usize, dst: &mut [u8]) -> Result<(), BoundaryFault> {
        self.0.read(offset, dst)
    }

    fn write(&mut self, offset: usize, src: &[u8]) -> Result<(), BoundaryFault> {
        self.0.write(offset, src)
    }
}
