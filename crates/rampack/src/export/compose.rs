// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! docker-compose project generation.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::{ResolvedApp, ResolvedService};
use crate::scripts::{COMPOSE_RUN_SCRIPT, write_script};
use crate::{Error, Result};

pub const COMPOSE_FILENAME: &str = "docker-compose.yaml";
pub const RUN_SCRIPT_FILENAME: &str = "run.sh";

const COMPOSE_VERSION: &str = "2.1";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DockerComposeFile {
    pub version: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, GlobalVolume>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub services: IndexMap<String, Service>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GlobalVolume {
    pub external: bool,
}

/// One entry of `services`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Service {
    pub image: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_mode: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logging {
    pub driver: String,
    pub options: LoggingOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingOptions {
    #[serde(rename = "max-size")]
    pub max_size: String,
    #[serde(rename = "max-file")]
    pub max_file: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            driver: "json-file".to_string(),
            options: LoggingOptions {
                max_size: "5m".to_string(),
                max_file: "2".to_string(),
            },
        }
    }
}

impl Service {
    fn from_resolved(service: &ResolvedService<'_>) -> Self {
        Self {
            image: service.component.image.clone(),
            container_name: service.name.clone(),
            restart: "always".to_string(),
            network_mode: "host".to_string(),
            volumes: service.mounts.iter().map(ToString::to_string).collect(),
            command: service.component.cmd.clone(),
            environment: service.environment.clone(),
            depends_on: service.depends_on.clone(),
            logging: Logging::default(),
        }
    }
}

impl DockerComposeFile {
    pub fn from_resolved(resolved: &ResolvedApp<'_>) -> Self {
        let volumes = resolved
            .volumes
            .global_volumes()
            .iter()
            .map(|name| (name.clone(), GlobalVolume { external: false }))
            .collect();
        let services = resolved
            .services
            .iter()
            .map(|s| (s.name.clone(), Service::from_resolved(s)))
            .collect();
        Self {
            version: COMPOSE_VERSION.to_string(),
            volumes,
            services,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|error| Error::InvalidYaml {
            error,
            yaml_content: String::new(),
        })
    }
}

/// Write `docker-compose.yaml`, `run.sh` and the config-file volumes.
pub fn write(resolved: &ResolvedApp<'_>, dir: &Path) -> Result<()> {
    super::write_service_dirs(resolved, dir)?;

    let compose = DockerComposeFile::from_resolved(resolved);
    let path = dir.join(COMPOSE_FILENAME);
    std::fs::write(&path, compose.to_yaml()?).map_err(|error| Error::WriteFailed {
        path: path.clone(),
        error,
    })?;
    tracing::info!(
        path = %path.display(),
        services = compose.services.len(),
        volumes = compose.volumes.len(),
        "wrote compose file"
    );

    write_script(&dir.join(RUN_SCRIPT_FILENAME), COMPOSE_RUN_SCRIPT)
}
