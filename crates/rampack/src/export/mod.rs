// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Application exporters.
//!
//! Every format runs the same pipeline:
//!
//! ```text
//! Init -> DirPrepared -> ComponentsSaved -> PluginsSaved -> ArtifactWritten -> Packaged -> Done
//! ```
//!
//! `PluginsSaved` is only visited by the offline format. The export
//! directory is always rebuilt from scratch, and the first error stops the
//! run, reported as [`Error::ExportFailed`] with the last stage reached.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::PackagerConfig;
use crate::env::TokenCache;
use crate::graph::ResolvedApp;
use crate::image::ImageClient;
use crate::manifest::LayerSelector;
use crate::model::Application;
use crate::naming;
use crate::{COMPONENT_IMAGES_TAR, Error, PLUGIN_IMAGES_TAR, Result};

pub mod compose;
pub mod offline;
pub mod slug;


/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Metadata plus saved image archives, importable elsewhere.
    Offline,
    DockerCompose,
    /// Build artifacts of source-built components with control scripts.
    Slug,
}

impl ExportFormat {
    /// Suffix used for the export directory and package name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Offline => "ram",
            Self::DockerCompose => "dockercompose",
            Self::Slug => "slug",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" | "ram" => Ok(Self::Offline),
            "docker-compose" | "dockercompose" | "compose" => Ok(Self::DockerCompose),
            "slug" => Ok(Self::Slug),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::DockerCompose => f.write_str("docker-compose"),
            Self::Slug => f.write_str("slug"),
        }
    }
}

/// States of the export pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportStage {
    Init,
    DirPrepared,
    ComponentsSaved,
    PluginsSaved,
    ArtifactWritten,
    Packaged,
    Done,
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::DirPrepared => "dir-prepared",
            Self::ComponentsSaved => "components-saved",
            Self::PluginsSaved => "plugins-saved",
            Self::ArtifactWritten => "artifact-written",
            Self::Packaged => "packaged",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Caller supplied settings for one export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory receiving the export directory and the package.
    pub home: PathBuf,
    pub pull_timeout: Option<Duration>,
    pub slug_layer: LayerSelector,
}

impl ExportOptions {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            pull_timeout: None,
            slug_layer: LayerSelector::default(),
        }
    }

    pub fn from_config(config: &PackagerConfig) -> Self {
        Self {
            home: config.home_dir(),
            pull_timeout: config.pull_timeout(),
            slug_layer: config.slug_layer,
        }
    }
}

/// Where a finished export was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub package_name: String,
    pub package_path: PathBuf,
}

/// Runs one export of one application.
pub struct Exporter {
    format: ExportFormat,
    options: ExportOptions,
    app: Application,
    client: Arc<dyn ImageClient>,
    stage: ExportStage,
}

impl Exporter {
    pub fn new(
        format: ExportFormat,
        options: ExportOptions,
        app: Application,
        client: Arc<dyn ImageClient>,
    ) -> Self {
        Self {
            format,
            options,
            app,
            client,
            stage: ExportStage::Init,
        }
    }

    /// Last stage the pipeline reached.
    pub fn stage(&self) -> ExportStage {
        self.stage
    }

    /// `<name>-<version>-<suffix>`, shared by the export directory and the package.
    pub fn base_name(&self) -> String {
        format!(
            "{}-{}-{}",
            naming::sanitize(&self.app.app_name),
            naming::sanitize(&self.app.app_version),
            self.format.suffix()
        )
    }

    pub fn export_dir(&self) -> PathBuf {
        self.options.home.join(self.base_name())
    }

    /// Run the pipeline from the start.
    pub async fn export(&mut self) -> Result<ExportResult> {
        self.stage = ExportStage::Init;
        tracing::info!(
            app = %self.app.app_name,
            format = %self.format,
            backend = self.client.backend(),
            "starting export"
        );
        match self.run().await {
            Ok(result) => Ok(result),
            Err(source) => {
                tracing::error!(app = %self.app.app_name, stage = %self.stage, "export failed: {source}");
                Err(Error::ExportFailed {
                    app: self.app.app_name.clone(),
                    stage: self.stage,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn run(&mut self) -> Result<ExportResult> {
        self.app.validate()?;
        let dir = self.export_dir();
        prepare_dir(&dir)?;
        self.advance(ExportStage::DirPrepared);

        self.save_components(&dir).await?;
        self.advance(ExportStage::ComponentsSaved);

        if self.format == ExportFormat::Offline {
            self.save_plugins(&dir).await?;
            self.advance(ExportStage::PluginsSaved);
        }

        self.write_artifact(&dir).await?;
        self.advance(ExportStage::ArtifactWritten);

        let package_name = format!("{}.tar.gz", self.base_name());
        let package_path = self.options.home.join(&package_name);
        let (src, dest) = (dir.clone(), package_path.clone());
        run_blocking(move || crate::archive::package_dir(&src, &dest)).await?;
        self.advance(ExportStage::Packaged);

        self.advance(ExportStage::Done);
        Ok(ExportResult {
            format: self.format,
            package_name,
            package_path,
        })
    }

    fn advance(&mut self, stage: ExportStage) {
        tracing::info!(app = %self.app.app_name, %stage, "export stage reached");
        self.stage = stage;
    }

    /// Pull every component image, one after the other, and save them into
    /// one archive.
    async fn save_components(&self, dir: &Path) -> Result<()> {
        let mut references = Vec::new();
        for component in &self.app.components {
            if component.image.is_empty() {
                tracing::debug!(component = %component.display_name, "no image, nothing to pull");
                continue;
            }
            tracing::info!(component = %component.display_name, image = %component.image, "pulling image");
            let credentials = component.image_hub.credentials();
            let local = self
                .client
                .pull(&component.image, credentials.as_ref(), self.options.pull_timeout)
                .await
                .map_err(|e| {
                    e.into_error(|reason| Error::ImagePull {
                        owner: component.display_name.clone(),
                        image: component.image.clone(),
                        reason,
                    })
                })?;
            references.push(local);
        }
        self.save_images(&dir.join(COMPONENT_IMAGES_TAR), references).await
    }

    async fn save_plugins(&self, dir: &Path) -> Result<()> {
        let mut references = Vec::new();
        for plugin in &self.app.plugins {
            if plugin.image.is_empty() {
                continue;
            }
            tracing::info!(plugin = %plugin.name, image = %plugin.image, "pulling plugin image");
            let credentials = plugin.image_hub.credentials();
            let local = self
                .client
                .pull(&plugin.image, credentials.as_ref(), self.options.pull_timeout)
                .await
                .map_err(|e| {
                    e.into_error(|reason| Error::ImagePull {
                        owner: plugin.name.clone(),
                        image: plugin.image.clone(),
                        reason,
                    })
                })?;
            references.push(local);
        }
        self.save_images(&dir.join(PLUGIN_IMAGES_TAR), references).await
    }

    async fn save_images(&self, path: &Path, references: Vec<String>) -> Result<()> {
        if references.is_empty() {
            tracing::debug!(path = %path.display(), "no images to save");
            return Ok(());
        }
        tracing::info!(path = %path.display(), count = references.len(), "saving images");
        self.client
            .save(path, &references)
            .await
            .map_err(|e| {
                e.into_error(|reason| Error::ImageSave {
                    path: path.to_path_buf(),
                    images: references.clone(),
                    reason,
                })
            })
    }

    async fn write_artifact(&self, dir: &Path) -> Result<()> {
        let mut tokens = TokenCache::new();
        match self.format {
            ExportFormat::Offline => {
                let resolved = ResolvedApp::resolve(&self.app, &mut tokens);
                offline::write(&resolved, dir)
            }
            ExportFormat::DockerCompose => {
                let resolved = ResolvedApp::resolve(&self.app, &mut tokens);
                compose::write(&resolved, dir)
            }
            ExportFormat::Slug => {
                let plan = {
                    let resolved = ResolvedApp::resolve(&self.app, &mut tokens);
                    slug::SlugPlan::build(&resolved, &mut tokens)
                };
                let dir = dir.to_path_buf();
                let layer = self.options.slug_layer;
                run_blocking(move || plan.write(&dir, layer)).await
            }
        }
    }
}

/// Remove any previous export directory and create an empty one.
pub fn prepare_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|error| Error::DirPrep {
            path: dir.to_path_buf(),
            error,
        })?;
    }
    std::fs::create_dir_all(dir).map_err(|error| Error::DirPrep {
        path: dir.to_path_buf(),
        error,
    })?;
    tracing::debug!(path = %dir.display(), "prepared export directory");
    Ok(())
}

/// Create `<dir>/<service>` for every component and write the config-file
/// volumes into them.
pub(crate) fn write_service_dirs(resolved: &ResolvedApp<'_>, dir: &Path) -> Result<()> {
    for service in &resolved.services {
        let service_dir = dir.join(&service.name);
        std::fs::create_dir_all(&service_dir).map_err(|error| Error::WriteFailed {
            path: service_dir.clone(),
            error,
        })?;
    }
    for file in resolved.volumes.config_files() {
        let path = dir.join(file.checked_path()?);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| Error::WriteFailed {
                path: parent.to_path_buf(),
                error,
            })?;
        }
        std::fs::write(&path, &file.content).map_err(|error| Error::WriteFailed {
            path: path.clone(),
            error,
        })?;
        tracing::debug!(service = %file.service_name, path = %path.display(), "wrote config file");
    }
    Ok(())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
}
