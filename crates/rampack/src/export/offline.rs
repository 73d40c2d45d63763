// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Offline bundle: `metadata.json` next to the saved image archives.

use std::path::Path;

use crate::graph::ResolvedApp;
use crate::{Error, METADATA_FILENAME, Result};

/// Write the credential-free application model and the config-file volumes.
pub fn write(resolved: &ResolvedApp<'_>, dir: &Path) -> Result<()> {
    let mut metadata = resolved.app.clone();
    metadata.strip_credentials();

    let path = dir.join(METADATA_FILENAME);
    std::fs::write(&path, metadata.to_json()?).map_err(|error| Error::WriteFailed {
        path: path.clone(),
        error,
    })?;
    tracing::info!(path = %path.display(), "wrote application metadata");

    super::write_service_dirs(resolved, dir)
}
