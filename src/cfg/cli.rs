// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable that overrides any relative config path.
pub const CONFIG_ENV: &str = "SCSI_IOCTL_CONFIG";

/// Resolve a config path: the env override wins, then absolute paths are
/// taken as-is, then the path is joined onto the working directory. The
/// result is canonicalized so later error messages name a real file.
pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let chosen = match std::env::var(CONFIG_ENV) {
        Ok(v) if !v.is_empty() => PathBuf::from(v),
        _ => {
            let p = Path::new(rel);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                std::env::current_dir()
                    .context("cannot get current working dir")?
                    .join(p)
            }
        }
    };

    chosen
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {chosen:?}"))
}
