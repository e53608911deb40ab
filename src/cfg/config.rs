// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::dispatch::{IOCTL_NORMAL_TIMEOUT, NORMAL_RETRIES, START_STOP_TIMEOUT, marshal};

/// Runtime policy for the dispatch core. Compile-time defaults mirror
/// the historical constants; a YAML file can override them per
/// deployment.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Timeout and retry budget handed to the command transport.
    pub execution: ExecutionConfig,
    /// Bounds on caller-requested transfers.
    pub limits: Limits,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ExecutionConfig {
    #[serde(rename = "NormalTimeout", with = "serde_secs")]
    /// Timeout for ordinary internal commands.
    pub normal_timeout: Duration,

    #[serde(rename = "StartStopTimeout", with = "serde_secs")]
    /// Timeout class for start/stop and security-protocol commands.
    pub start_stop_timeout: Duration,

    #[serde(rename = "NormalRetries")]
    /// Transient-failure budget per command.
    pub normal_retries: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Limits {
    #[serde(rename = "MaxTransferLength")]
    /// Upper bound on one variable-length transfer. Never raised above
    /// the compiled-in maximum.
    pub max_transfer: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            normal_timeout: IOCTL_NORMAL_TIMEOUT,
            start_stop_timeout: START_STOP_TIMEOUT,
            normal_retries: NORMAL_RETRIES,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_transfer: marshal::MAX_BUFFLEN,
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.execution.normal_timeout.is_zero(),
            "NormalTimeout must be > 0"
        );
        ensure!(
            !self.execution.start_stop_timeout.is_zero(),
            "StartStopTimeout must be > 0"
        );
        ensure!(self.limits.max_transfer > 0, "MaxTransferLength must be > 0");

        // The compiled-in bound is a hard ceiling, not a default.
        if self.limits.max_transfer > marshal::MAX_BUFFLEN {
            self.limits.max_transfer = marshal::MAX_BUFFLEN;
        }

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
