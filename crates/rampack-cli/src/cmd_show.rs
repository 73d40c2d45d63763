// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rampack show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use rampack::{Application, ResolvedApp, TokenCache};

/// Display resolved service names, mounts, and environments
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Application model (metadata.json)
    metadata: PathBuf,

    /// Output format: table, yaml, json
    #[clap(long, default_value = "table", value_parser = ["table", "yaml", "json"])]
    format: String,
}

impl CmdShow {
    pub async fn run(&mut self) -> Result<i32> {
        let app = Application::load(&self.metadata)?;
        let mut tokens = TokenCache::new();
        let resolved = ResolvedApp::resolve(&app, &mut tokens);

        match self.format.as_str() {
            "yaml" => {
                let yaml = serde_yaml::to_string(&to_value(&resolved)).into_diagnostic()?;
                print!("{yaml}");
            }
            "json" => {
                let json = serde_json::to_string_pretty(&to_value(&resolved)).into_diagnostic()?;
                println!("{json}");
            }
            _ => self.show_table(&resolved),
        }
        Ok(0)
    }

    fn show_table(&self, resolved: &ResolvedApp<'_>) {
        println!(
            "{} {}",
            resolved.app.app_name.bold(),
            resolved.app.app_version.dimmed()
        );
        println!();

        for (i, service) in resolved.services.iter().enumerate() {
            let component = service.component;
            println!(
                "  {}. {} ({})",
                i + 1,
                service.name.cyan(),
                component.display_name
            );
            if !component.image.is_empty() {
                println!("     image: {}", component.image.green());
            }
            if !service.depends_on.is_empty() {
                println!("     depends on: {}", service.depends_on.join(", ").yellow());
            }
            for mount in &service.mounts {
                println!("     mount: {mount}");
            }
            for (key, value) in &service.environment {
                println!("     {} = {}", key.cyan(), value);
            }
        }

        let volumes = resolved.volumes.global_volumes();
        println!();
        if volumes.is_empty() {
            println!("  {}", "(no shared volumes)".dimmed());
        } else {
            println!("{}", "Shared Volumes:".bold());
            for volume in volumes {
                println!("  - {}", volume.green());
            }
        }
        println!();
        println!("Total: {} service(s)", resolved.services.len());
    }
}

fn to_value(resolved: &ResolvedApp<'_>) -> serde_json::Value {
    let services: Vec<serde_json::Value> = resolved
        .services
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.name,
                "share_id": s.component.share_id,
                "component_key": s.component.component_key,
                "image": s.component.image,
                "depends_on": s.depends_on,
                "mounts": s.mounts.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "environment": s.environment,
            })
        })
        .collect();
    serde_json::json!({
        "app_name": resolved.app.app_name,
        "app_version": resolved.app.app_version,
        "services": services,
        "volumes": resolved.volumes.global_volumes(),
    })
}
