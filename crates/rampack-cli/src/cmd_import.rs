// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rampack import` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::Result;
use rampack::{ImageBackend, Importer};

use crate::ConfigFlags;

/// Import an offline bundle into a registry
#[derive(Debug, Args)]
pub struct CmdImport {
    #[clap(flatten)]
    config: ConfigFlags,

    /// Bundle to import (.tar.gz, .tar or .zip)
    bundle: PathBuf,

    /// Target registry host
    #[clap(long, env = "RAMPACK_HUB_URL")]
    hub_url: Option<String>,

    /// Target registry user
    #[clap(long, env = "RAMPACK_HUB_USER")]
    hub_user: Option<String>,

    /// Target registry password
    #[clap(long, env = "RAMPACK_HUB_PASSWORD", hide_env_values = true)]
    hub_password: Option<String>,

    /// Target registry namespace
    #[clap(long, env = "RAMPACK_HUB_NAMESPACE")]
    namespace: Option<String>,

    /// Image backend: docker, containerd
    #[clap(long, env = "RAMPACK_BACKEND")]
    backend: Option<ImageBackend>,

    /// Per-image push timeout in seconds
    #[clap(long, env = "RAMPACK_PUSH_TIMEOUT")]
    push_timeout: Option<u64>,

    /// Write the rewritten application model here instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl CmdImport {
    pub async fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;

        let mut hub = config.registry.to_image_hub();
        if let Some(url) = &self.hub_url {
            hub.hub_url = url.clone();
        }
        if let Some(user) = &self.hub_user {
            hub.hub_user = user.clone();
        }
        if let Some(password) = &self.hub_password {
            hub.hub_password = password.clone();
        }
        if let Some(namespace) = &self.namespace {
            hub.namespace = namespace.clone();
        }

        let backend = self.backend.unwrap_or(config.backend);
        let client = rampack::image::connect(backend, &config.containerd_namespace);
        let push_timeout = self
            .push_timeout
            .map(std::time::Duration::from_secs)
            .or_else(|| config.push_timeout());

        let work_root = rampack::config::ensure_dir(&config.work_root())?;
        let importer = Importer::new(work_root, client).with_push_timeout(push_timeout);
        let app = importer.import(&self.bundle, &hub).await?;
        let json = app.to_json()?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, json).map_err(|error| rampack::Error::WriteFailed {
                    path: path.clone(),
                    error,
                })?;
                eprintln!(
                    "{} {} {} -> {}",
                    "Imported".green().bold(),
                    app.app_name.cyan(),
                    app.app_version.cyan(),
                    path.display()
                );
            }
            None => println!("{json}"),
        }
        Ok(0)
    }
}
