// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Runs image tool commands with an optional timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::{ClientError, ClientResult};

#[cfg(test)]
#[path = "./command_test.rs"]
mod command_test;

/// An external command plus the label it is logged and reported under.
///
/// The label never carries credentials, unlike `args` which may.
#[derive(Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    label: String,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Append an argument that is safe to log.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        let arg = arg.into();
        self.label.push(' ');
        self.label.push_str(&arg);
        self.args.push(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Append an argument whose value is masked in the label.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.label.push_str(" ***");
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run to completion and return stdout.
    ///
    /// A non-zero exit is an error carrying the trimmed stderr. When the
    /// timeout elapses the child is killed.
    pub async fn run(&self, timeout: Option<Duration>) -> ClientResult<String> {
        tracing::debug!(command = %self.label, ?timeout, "running image tool");
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output();
        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, output)
                .await
                .map_err(|_| ClientError::Timeout {
                    command: self.label.clone(),
                    timeout: limit,
                })?,
            None => output.await,
        }
        .map_err(|source| ClientError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(command = %self.label, code = ?output.status.code(), %stderr, "image tool failed");
            return Err(ClientError::Failed {
                command: self.label.clone(),
                code: output.status.code(),
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl std::fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCommand")
            .field("label", &self.label)
            .field("envs", &self.envs.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
