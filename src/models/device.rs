// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The logical-unit handle the dispatcher borrows for one call.
//!
//! The surrounding driver owns the device; this core mutates only the
//! flag bits, and only as documented side effects of DOORLOCK/DOORUNLOCK
//! and sense interpretation.

use bitflags::bitflags;

bitflags! {
    /// Mutable device state observable by the surrounding driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceFlags: u8 {
        /// The medium can be ejected.
        const REMOVABLE = 1 << 0;
        /// The device supports PREVENT/ALLOW MEDIUM REMOVAL.
        const LOCKABLE = 1 << 1;
        /// Medium removal is currently prevented.
        const LOCKED = 1 << 2;
        /// A media change was observed since the flag was last cleared.
        const MEDIA_CHANGED = 1 << 3;
    }
}

/// SCSI addressing of one logical unit below its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub channel: u32,
    pub id: u32,
    pub lun: u32,
}

/// Identity of the host adapter the unit hangs off.
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    /// Host number as enumerated by the driver framework.
    pub host_no: u32,
    /// Adapter-unique identifier reported through GET_IDLUN.
    pub unique_id: u32,
    /// Short driver name, also the key for driver-family exclusions.
    pub name: String,
    /// Optional long identification string; PROBE_HOST prefers it.
    pub info: Option<String>,
    /// PCI bus-slot name, when the adapter has a PCI identity.
    pub pci_name: Option<String>,
}

impl HostInfo {
    /// The identification string PROBE_HOST reports: the long form when
    /// the adapter provides one, the driver name otherwise.
    pub fn identification(&self) -> &str {
        self.info.as_deref().unwrap_or(&self.name)
    }
}

/// One SCSI logical unit, borrowed for the duration of a dispatch call.
#[derive(Debug, Clone)]
pub struct ScsiDevice {
    pub identity: DeviceIdentity,
    pub host: HostInfo,
    flags: DeviceFlags,
}

impl ScsiDevice {
    pub fn new(identity: DeviceIdentity, host: HostInfo) -> Self {
        Self {
            identity,
            host,
            flags: DeviceFlags::empty(),
        }
    }

    /// Builder-style flag seeding, used by drivers at scan time.
    pub fn with_flags(mut self, flags: DeviceFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn flags(&self) -> DeviceFlags {
        self.flags
    }

    #[inline]
    pub fn is_removable(&self) -> bool {
        self.flags.contains(DeviceFlags::REMOVABLE)
    }

    #[inline]
    pub fn is_lockable(&self) -> bool {
        self.flags.contains(DeviceFlags::LOCKABLE)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.flags.contains(DeviceFlags::LOCKED)
    }

    #[inline]
    pub fn media_changed(&self) -> bool {
        self.flags.contains(DeviceFlags::MEDIA_CHANGED)
    }

    /// Set after a successful PREVENT/ALLOW MEDIUM REMOVAL, never
    /// speculatively.
    pub fn set_locked(&mut self, locked: bool) {
        self.flags.set(DeviceFlags::LOCKED, locked);
    }

    /// The device answered ILLEGAL REQUEST to a medium-removal command:
    /// it cannot lock, stop asking.
    pub fn clear_lockable(&mut self) {
        self.flags.remove(DeviceFlags::LOCKABLE);
    }

    pub fn set_media_changed(&mut self, changed: bool) {
        self.flags.set(DeviceFlags::MEDIA_CHANGED, changed);
    }

    /// Pack the four-level address into the GET_IDLUN composite word:
    /// id in the low byte, then lun, channel and host number upwards.
    pub fn composite_id(&self) -> u32 {
        (self.identity.id & 0xff)
            | ((self.identity.lun & 0xff) << 8)
            | ((self.identity.channel & 0xff) << 16)
            | ((self.host.host_no & 0xff) << 24)
    }
}
