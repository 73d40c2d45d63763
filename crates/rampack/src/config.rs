// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Packager configuration loaded from YAML.
//!
//! ```yaml
//! api: rampack/v0
//! home: ~/.rampack
//! backend: containerd
//! containerd_namespace: k8s.io
//! pull_timeout_secs: 600
//! slug_layer: last
//! registry:
//!   url: image.example.com
//!   user: admin
//!   password: secret
//!   namespace: apps
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::image::ImageBackend;
use crate::image::containerd::DEFAULT_NAMESPACE;
use crate::manifest::LayerSelector;
use crate::model::ImageHub;

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Default output home, relative to the user's home directory.
pub const DEFAULT_HOME_DIR: &str = ".rampack";

/// API version for config files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "rampack/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    #[allow(dead_code)]
    api: ApiVersion,
}

/// Target registry for imports.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegistryConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub namespace: String,
}

impl RegistryConfig {
    pub fn to_image_hub(&self) -> ImageHub {
        ImageHub {
            hub_url: self.url.clone(),
            hub_user: self.user.clone(),
            hub_password: self.password.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Settings shared by export and import.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackagerConfig {
    #[serde(default)]
    pub api: ApiVersion,

    /// Where export directories and packages are written. Supports `~/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// Shared scratch root; every import gets its own subdirectory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    #[serde(default)]
    pub backend: ImageBackend,

    #[serde(default = "default_namespace")]
    pub containerd_namespace: String,

    /// Per-image pull timeout; unset means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_timeout_secs: Option<u64>,

    /// Per-image push timeout; unset means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_timeout_secs: Option<u64>,

    #[serde(default)]
    pub slug_layer: LayerSelector,

    #[serde(default)]
    pub registry: RegistryConfig,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            api: ApiVersion::default(),
            home: None,
            work_dir: None,
            backend: ImageBackend::default(),
            containerd_namespace: default_namespace(),
            pull_timeout_secs: None,
            push_timeout_secs: None,
            slug_layer: LayerSelector::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl PackagerConfig {
    /// Parse config from a YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> crate::Result<Self> {
        let yaml = yaml.into();

        let value: serde_yaml::Value =
            serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;
        // An empty document is a config with every default.
        if value.is_null() {
            return Ok(Self::default());
        }

        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml.clone(),
            })?;

        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value).map_err(|e| crate::Error::InvalidYaml {
                error: e,
                yaml_content: yaml,
            }),
        }
    }

    /// Load config from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(yaml)
    }

    /// Output home with `~/` expanded, defaulting to `~/.rampack`.
    pub fn home_dir(&self) -> PathBuf {
        match &self.home {
            Some(home) => expand_home(home),
            None => dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(DEFAULT_HOME_DIR),
        }
    }

    /// Scratch root, defaulting to `<system temp>/rampack`.
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("rampack"))
    }

    pub fn pull_timeout(&self) -> Option<Duration> {
        self.pull_timeout_secs.map(Duration::from_secs)
    }

    pub fn push_timeout(&self) -> Option<Duration> {
        self.push_timeout_secs.map(Duration::from_secs)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let rel = path.strip_prefix("~/").unwrap_or("");
            return home.join(rel);
        }
    }
    PathBuf::from(path)
}

/// Create `dir` if needed and return its canonical form.
pub fn ensure_dir(dir: &Path) -> crate::Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|error| crate::Error::DirPrep {
        path: dir.to_path_buf(),
        error,
    })?;
    dunce::canonicalize(dir).map_err(|error| crate::Error::DirPrep {
        path: dir.to_path_buf(),
        error,
    })
}
