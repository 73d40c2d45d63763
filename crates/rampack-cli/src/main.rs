// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! rampack - Application Model Packager CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;
use rampack::PackagerConfig;

mod cmd_export;
mod cmd_import;
mod cmd_show;

use cmd_export::CmdExport;
use cmd_import::CmdImport;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "rampack",
    about = "Application Model Packager",
    version,
    long_about = "Export multi-component application models as offline, docker-compose, or slug bundles, and import offline bundles into a registry"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct ConfigFlags {
    /// Packager configuration file (YAML)
    #[clap(long = "config", short = 'c', env = "RAMPACK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConfigFlags {
    /// Load the configuration file, or the defaults when none is given.
    pub fn load(&self) -> Result<PackagerConfig> {
        match &self.config {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Ok(PackagerConfig::load(path)?)
            }
            None => Ok(PackagerConfig::default()),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Export an application model as a bundle
    Export(CmdExport),

    /// Import an offline bundle into a registry
    Import(CmdImport),

    /// Display resolved service names, mounts, and environments
    Show(CmdShow),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        match self.cmd {
            Command::Export(mut cmd) => cmd.run().await,
            Command::Import(mut cmd) => cmd.run().await,
            Command::Show(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}
