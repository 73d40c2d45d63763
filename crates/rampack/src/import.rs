// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Import of offline bundles into a target registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::image::{Credentials, ImageClient};
use crate::model::{Application, ImageHub};
use crate::reference::ImageReference;
use crate::{Error, METADATA_FILENAME, Result};

#[cfg(test)]
#[path = "./import_test.rs"]
mod import_test;

/// Loads an offline bundle and republishes its images.
pub struct Importer {
    work_root: PathBuf,
    client: Arc<dyn ImageClient>,
    push_timeout: Option<Duration>,
}

impl Importer {
    /// `work_root` may be shared; every import unpacks into its own
    /// `import-<ulid>` subdirectory.
    pub fn new(work_root: impl Into<PathBuf>, client: Arc<dyn ImageClient>) -> Self {
        Self {
            work_root: work_root.into(),
            client,
            push_timeout: None,
        }
    }

    pub fn with_push_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Import `bundle` (`.zip`, `.tar` or `.tar.gz`) and push every image
    /// to `hub`. Returns the application model with its image references
    /// and registry credentials rewritten for `hub`.
    pub async fn import(&self, bundle: &Path, hub: &ImageHub) -> Result<Application> {
        if hub.hub_url.trim().is_empty() {
            return Err(Error::MissingHubUrl);
        }
        tracing::info!(bundle = %bundle.display(), hub = %hub.hub_url, "starting import");

        let work_dir = self
            .work_root
            .join(format!("import-{}", ulid::Ulid::new().to_string().to_lowercase()));
        std::fs::create_dir_all(&work_dir).map_err(|error| Error::DirPrep {
            path: work_dir.clone(),
            error,
        })?;

        let result = self.import_into(bundle, hub, &work_dir).await;
        if let Err(err) = std::fs::remove_dir_all(&work_dir) {
            tracing::warn!(path = %work_dir.display(), "failed to clean up import directory: {err}");
        }
        result
    }

    async fn import_into(&self, bundle: &Path, hub: &ImageHub, work_dir: &Path) -> Result<Application> {
        let (src, dest) = (bundle.to_path_buf(), work_dir.to_path_buf());
        tokio::task::spawn_blocking(move || crate::archive::unpack(&src, &dest))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))??;

        let root = bundle_root(work_dir)?;
        let mut app = Application::load(root.join(METADATA_FILENAME))?;
        tracing::info!(app = %app.app_name, version = %app.app_version, "read application metadata");

        for archive in crate::archive::find_tar_files(&root)? {
            tracing::info!(path = %archive.display(), "loading images");
            self.client.load(&archive).await.map_err(|e| {
                e.into_error(|reason| Error::ImageLoad {
                    path: archive.clone(),
                    reason,
                })
            })?;
        }

        let credentials = hub.credentials();
        for component in &mut app.components {
            if component.image.is_empty() {
                continue;
            }
            component.image = self
                .republish(&component.image, hub, credentials.as_ref())
                .await?;
            component.image_hub = hub.clone();
        }
        for plugin in &mut app.plugins {
            if plugin.image.is_empty() {
                continue;
            }
            plugin.image = self
                .republish(&plugin.image, hub, credentials.as_ref())
                .await?;
            plugin.image_hub = hub.clone();
        }

        tracing::info!(app = %app.app_name, "import finished");
        Ok(app)
    }

    /// Tag a loaded image for `hub` and push it, returning the new reference.
    async fn republish(
        &self,
        image: &str,
        hub: &ImageHub,
        credentials: Option<&Credentials>,
    ) -> Result<String> {
        let target = ImageReference::parse(image)?.retarget(&hub.hub_url, &hub.namespace);
        tracing::debug!(image, target = %target, "retagging image");
        self.client.tag(image, &target).await.map_err(|e| {
            e.into_error(|reason| Error::ImageTag {
                source_ref: image.to_string(),
                target: target.clone(),
                reason,
            })
        })?;

        tracing::info!(image = %target, "pushing image");
        self.client
            .push(&target, credentials, self.push_timeout)
            .await
            .map_err(|e| {
                e.into_error(|reason| Error::ImagePush {
                    image: target.clone(),
                    reason,
                })
            })?;
        Ok(target)
    }
}

/// Directory holding `metadata.json`: the unpack directory itself, or else
/// its first subdirectory.
fn bundle_root(work_dir: &Path) -> Result<PathBuf> {
    if work_dir.join(METADATA_FILENAME).is_file() {
        return Ok(work_dir.to_path_buf());
    }
    crate::archive::read_dir_sorted(work_dir)?
        .into_iter()
        .find(|p| p.is_dir())
        .ok_or_else(|| Error::ReadFailed {
            path: work_dir.join(METADATA_FILENAME),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "bundle is empty"),
        })
}
