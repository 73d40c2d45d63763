// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! [`ImageClient`] backed by the `docker` CLI.
//!
//! Registry credentials are handed to each pull or push through a private
//! `DOCKER_CONFIG` directory, so the user's own docker login state is never
//! read or modified.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::command::ToolCommand;
use super::{ClientResult, Credentials, ImageClient};
use crate::reference::{DEFAULT_REGISTRY, ImageReference};

const DOCKER_HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";

/// Talks to the local docker daemon through its CLI.
#[derive(Debug, Clone)]
pub struct DockerClient {
    program: String,
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerClient {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.program)
    }

    /// Run a registry command, with a throwaway config holding `credentials`.
    async fn run_authenticated(
        &self,
        command: ToolCommand,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<String> {
        let Some(credentials) = credentials else {
            return command.run(timeout).await;
        };
        let config_dir = tempfile::Builder::new().prefix("rampack-docker-").tempdir()?;
        write_auth_config(config_dir.path(), reference, credentials)?;
        command
            .env("DOCKER_CONFIG", config_dir.path().to_string_lossy())
            .run(timeout)
            .await
    }
}

/// Write a docker `config.json` with a single auth entry for the registry
/// of `reference`.
pub(crate) fn write_auth_config(
    dir: &Path,
    reference: &str,
    credentials: &Credentials,
) -> std::io::Result<()> {
    let registry = ImageReference::parse(reference)
        .map(|r| r.registry)
        .unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
    let key = if registry == DEFAULT_REGISTRY {
        DOCKER_HUB_AUTH_KEY.to_string()
    } else {
        registry
    };
    let config = json!({
        "auths": {
            key: { "auth": credentials.auth_token() }
        }
    });
    std::fs::write(dir.join("config.json"), config.to_string())
}

#[async_trait]
impl ImageClient for DockerClient {
    fn backend(&self) -> &'static str {
        "docker"
    }

    async fn pull(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<String> {
        let command = self.command().args(["pull", reference]);
        self.run_authenticated(command, reference, credentials, timeout)
            .await?;
        Ok(reference.to_string())
    }

    async fn save(&self, destination: &Path, references: &[String]) -> ClientResult<()> {
        self.command()
            .args(["save", "-o"])
            .arg(destination.to_string_lossy())
            .args(references.iter().cloned())
            .run(None)
            .await?;
        Ok(())
    }

    async fn load(&self, source: &Path) -> ClientResult<()> {
        let out = self
            .command()
            .args(["load", "-i"])
            .arg(source.to_string_lossy())
            .run(None)
            .await?;
        tracing::debug!(path = %source.display(), output = %out.trim(), "docker load");
        Ok(())
    }

    async fn push(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<()> {
        let command = self.command().args(["push", reference]);
        self.run_authenticated(command, reference, credentials, timeout)
            .await?;
        Ok(())
    }

    async fn tag(&self, source: &str, target: &str) -> ClientResult<()> {
        self.command().args(["tag", source, target]).run(None).await?;
        Ok(())
    }
}
