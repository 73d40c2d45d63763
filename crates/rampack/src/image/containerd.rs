// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! [`ImageClient`] backed by containerd's `ctr` tool.
//!
//! containerd only knows fully-qualified names, so every reference is
//! normalized before it is handed to `ctr`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::command::ToolCommand;
use super::{ClientResult, Credentials, ImageClient};
use crate::reference::ImageReference;

/// Namespace kubernetes-managed containerd uses for images.
pub const DEFAULT_NAMESPACE: &str = "k8s.io";

/// Talks to containerd through `ctr -n <namespace> images ...`.
#[derive(Debug, Clone)]
pub struct ContainerdClient {
    program: String,
    namespace: String,
}

impl ContainerdClient {
    pub fn new(namespace: &str) -> Self {
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        Self {
            program: "ctr".to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn images(&self) -> ToolCommand {
        ToolCommand::new(&self.program).args(["-n", self.namespace.as_str(), "images"])
    }

    fn with_credentials(command: ToolCommand, credentials: Option<&Credentials>) -> ToolCommand {
        match credentials {
            Some(c) => command
                .arg("--user")
                .secret_arg(format!("{}:{}", c.username, c.password)),
            None => command,
        }
    }
}

/// Fully-qualified form of a reference; unparseable input is passed through
/// for `ctr` to reject.
pub fn qualify(reference: &str) -> String {
    ImageReference::parse(reference)
        .map(|r| r.full_reference())
        .unwrap_or_else(|_| reference.to_string())
}

#[async_trait]
impl ImageClient for ContainerdClient {
    fn backend(&self) -> &'static str {
        "containerd"
    }

    async fn pull(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<String> {
        let local = qualify(reference);
        let command = Self::with_credentials(self.images().args(["pull", "--skip-verify"]), credentials)
            .arg(&local);
        command.run(timeout).await?;
        Ok(local)
    }

    async fn save(&self, destination: &Path, references: &[String]) -> ClientResult<()> {
        self.images()
            .arg("export")
            .arg(destination.to_string_lossy())
            .args(references.iter().map(|r| qualify(r)))
            .run(None)
            .await?;
        Ok(())
    }

    async fn load(&self, source: &Path) -> ClientResult<()> {
        self.images()
            .arg("import")
            .arg(source.to_string_lossy())
            .run(None)
            .await?;
        Ok(())
    }

    async fn push(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        timeout: Option<Duration>,
    ) -> ClientResult<()> {
        let command = Self::with_credentials(self.images().args(["push", "--skip-verify"]), credentials)
            .arg(qualify(reference));
        command.run(timeout).await?;
        Ok(())
    }

    async fn tag(&self, source: &str, target: &str) -> ClientResult<()> {
        self.images()
            .args(["tag", "--force"])
            .arg(qualify(source))
            .arg(qualify(target))
            .run(None)
            .await?;
        Ok(())
    }
}
