// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Image content pipeline.
//!
//! Exporters and the importer talk to a container engine only through the
//! [`ImageClient`] trait. Two adapters share that contract: one drives the
//! `docker` CLI and one drives containerd through `ctr`. Which one is used
//! is a configuration choice, see [`ImageBackend`] and [`connect`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Error;

pub mod command;
pub mod containerd;
pub mod docker;
#[cfg(test)]
pub(crate) mod memory;


pub use containerd::ContainerdClient;
pub use docker::DockerClient;

/// Username and password for one registry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Base64 `user:password`, as stored in a docker `config.json`.
    pub fn auth_token(&self) -> String {
        base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Failure reported by an image client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' exited with status {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("image {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Convert into a crate error, attaching context through `wrap`.
    ///
    /// Timeouts keep their own variant so callers can tell them apart.
    pub fn into_error(self, wrap: impl FnOnce(String) -> Error) -> Error {
        match self {
            ClientError::Timeout { command, timeout } => Error::CommandTimeout {
                command,
                secs: timeout.as_secs(),
            },
            other => wrap(other.to_string()),
        }
    }
}

/// Pull, save, load, push and tag container images.
///
/// Implementations run each call to completion before returning; callers
/// drive components one at a time.
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Pull `reference` and return the local name it can be saved under.
    async fn pull(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<String>;

    /// Write every listed image into one docker-save style archive.
    async fn save(&self, destination: &Path, references: &[String]) -> ClientResult<()>;

    /// Load every image found in an archive written by `save`.
    async fn load(&self, source: &Path) -> ClientResult<()>;

    async fn push(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<()>;

    /// Give `source` the additional name `target`, replacing any image
    /// already known by that name.
    async fn tag(&self, source: &str, target: &str) -> ClientResult<()>;
}

/// Which engine backs the image pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackend {
    #[default]
    Docker,
    Containerd,
}

impl std::str::FromStr for ImageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "containerd" | "ctr" => Ok(Self::Containerd),
            other => Err(format!("unknown image backend '{other}', expected docker or containerd")),
        }
    }
}

impl std::fmt::Display for ImageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Docker => f.write_str("docker"),
            Self::Containerd => f.write_str("containerd"),
        }
    }
}

/// Create the client for a backend.
pub fn connect(backend: ImageBackend, containerd_namespace: &str) -> Arc<dyn ImageClient> {
    let client: Arc<dyn ImageClient> = match backend {
        ImageBackend::Docker => Arc::new(DockerClient::new()),
        ImageBackend::Containerd => Arc::new(ContainerdClient::new(containerd_namespace)),
    };
    tracing::debug!(backend = client.backend(), "connected image client");
    client
}
