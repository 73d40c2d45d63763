// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rampack export` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;
use rampack::{Application, ExportFormat, ExportOptions, Exporter, ImageBackend, LayerSelector};

use crate::ConfigFlags;

/// Export an application model as a bundle
#[derive(Debug, Args)]
pub struct CmdExport {
    #[clap(flatten)]
    config: ConfigFlags,

    /// Application model (metadata.json)
    metadata: PathBuf,

    /// Bundle format: offline, docker-compose, slug
    #[clap(short, long, env = "RAMPACK_FORMAT", default_value = "offline")]
    format: ExportFormat,

    /// Directory receiving the export directory and package
    #[clap(long, env = "RAMPACK_HOME")]
    home: Option<PathBuf>,

    /// Image backend: docker, containerd
    #[clap(long, env = "RAMPACK_BACKEND")]
    backend: Option<ImageBackend>,

    /// Per-image pull timeout in seconds
    #[clap(long, env = "RAMPACK_PULL_TIMEOUT")]
    pull_timeout: Option<u64>,

    /// Layer holding the slug of source-built images: last, or an index
    #[clap(long, env = "RAMPACK_SLUG_LAYER")]
    slug_layer: Option<LayerSelector>,
}

impl CmdExport {
    pub async fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let app = Application::load(&self.metadata)?;

        let mut options = ExportOptions::from_config(&config);
        if let Some(home) = &self.home {
            options.home = rampack::config::expand_home(&home.to_string_lossy());
        }
        options.home = rampack::config::ensure_dir(&options.home)?;
        if let Some(secs) = self.pull_timeout {
            options.pull_timeout = Some(std::time::Duration::from_secs(secs));
        }
        if let Some(layer) = self.slug_layer {
            options.slug_layer = layer;
        }

        let backend = self.backend.unwrap_or(config.backend);
        let client = rampack::image::connect(backend, &config.containerd_namespace);

        eprintln!(
            "Exporting {} {} as {} to {}",
            app.app_name.cyan(),
            app.app_version.cyan(),
            self.format.to_string().yellow(),
            options.home.display()
        );

        let mut exporter = Exporter::new(self.format, options, app, client);
        let result = exporter.export().await?;

        eprintln!("{} {}", "Exported".green().bold(), result.package_name);
        println!("{}", result.package_path.display());
        Ok(0)
    }
}
