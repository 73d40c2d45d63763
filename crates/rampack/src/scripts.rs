// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Shell scripts shipped inside generated bundles.

use std::path::Path;

use crate::{Error, Result};

/// `run.sh` of a docker-compose bundle: installs docker and docker-compose
/// when missing, loads `component-images.tar`, then runs `up -d` (`start`)
/// or `down` (`stop`).
pub const COMPOSE_RUN_SCRIPT: &str = include_str!("scripts/run.sh");

/// `<component>.sh` of a slug bundle, with `start`, `stop` and `status`.
pub const SLUG_COMPONENT_SCRIPT: &str = include_str!("scripts/component.sh");

/// `<app>.sh` at the root of a slug bundle, fanning the same verbs out to
/// every component subdirectory.
pub const SLUG_APP_SCRIPT: &str = include_str!("scripts/umbrella.sh");

/// Write an executable script.
pub fn write_script(path: &Path, content: &str) -> Result<()> {
    let write_err = |error| Error::WriteFailed {
        path: path.to_path_buf(),
        error,
    };
    std::fs::write(path, content).map_err(write_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(write_err)?;
    }
    Ok(())
}
