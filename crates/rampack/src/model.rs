// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Application model parsing and data types for `metadata.json` documents.
//!
//! Field names are our own, but every field also accepts the key used by the
//! upstream application market (`service_cname`, `share_image`, ...) so that
//! metadata produced there can be exported without conversion.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::image::Credentials;

#[cfg(test)]
#[path = "./model_test.rs"]
mod model_test;

/// Environment value that asks for a random token at export time.
pub const GENERATE_SENTINEL: &str = "**None**";

/// A declarative multi-component application.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Application {
    #[serde(alias = "group_name")]
    pub app_name: String,

    #[serde(alias = "group_version")]
    pub app_version: String,

    #[serde(default, alias = "apps")]
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Plugin>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_config_groups: Vec<ConfigGroup>,
}

/// One deployable service of an application.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Component {
    /// Stable cross-app identity; unique within one application.
    #[serde(alias = "service_share_uuid")]
    pub share_id: String,

    #[serde(default, alias = "service_key")]
    pub component_key: String,

    #[serde(default, alias = "service_cname")]
    pub display_name: String,

    #[serde(default, alias = "share_image")]
    pub image: String,

    /// Registry the image is pulled from; stripped from offline metadata.
    #[serde(default, alias = "service_image")]
    pub image_hub: ImageHub,

    #[serde(default)]
    pub cmd: String,

    #[serde(default, alias = "port_map_list")]
    pub ports: Vec<Port>,

    #[serde(default, alias = "service_env_map_list")]
    pub envs: Vec<EnvVar>,

    /// Envs published to components that depend on this one.
    #[serde(default, alias = "service_connect_info_map_list")]
    pub connection_envs: Vec<EnvVar>,

    #[serde(default, alias = "service_volume_map_list")]
    pub volumes: Vec<Volume>,

    #[serde(default, alias = "dep_service_map_list")]
    pub dependencies: Vec<DependencyRef>,

    #[serde(default, alias = "service_source")]
    pub source_type: SourceType,

    /// Initial memory in MiB.
    #[serde(default)]
    pub memory: u32,
}

impl Component {
    /// First declared container port, used as `PORT`.
    pub fn primary_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.container_port)
    }

    /// Whether this component is built from source and ships a slug.
    pub fn is_source_built(&self) -> bool {
        self.source_type == SourceType::SourceCode
    }
}

/// How a component's image was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    #[default]
    Image,
    SourceCode,
}

impl From<String> for SourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "source_code" => Self::SourceCode,
            _ => Self::Image,
        }
    }
}

impl From<SourceType> for String {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Image => "image".to_string(),
            SourceType::SourceCode => "source_code".to_string(),
        }
    }
}

/// Registry location and credentials for one image.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ImageHub {
    #[serde(default)]
    pub hub_url: String,
    #[serde(default)]
    pub hub_user: String,
    #[serde(default)]
    pub hub_password: String,
    #[serde(default)]
    pub namespace: String,
}

impl ImageHub {
    /// Credentials to authenticate with, if a user is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.hub_user.is_empty() {
            return None;
        }
        Some(Credentials::new(&self.hub_user, &self.hub_password))
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl std::fmt::Debug for ImageHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHub")
            .field("hub_url", &self.hub_url)
            .field("hub_user", &self.hub_user)
            .field("hub_password", &"<redacted>")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Port {
    pub container_port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port_alias: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct EnvVar {
    #[serde(alias = "attr_name")]
    pub name: String,
    #[serde(default, alias = "attr_value")]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Storage mounted into a component.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Volume {
    #[serde(alias = "volume_name")]
    pub name: String,

    #[serde(alias = "volume_path")]
    pub mount_path: String,

    #[serde(default)]
    pub volume_type: VolumeType,

    /// Inline content, only meaningful for config-file volumes.
    #[serde(default, alias = "file_conent", skip_serializing_if = "String::is_empty")]
    pub file_content: String,
}

impl Volume {
    pub fn is_config_file(&self) -> bool {
        self.volume_type == VolumeType::ConfigFile
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum VolumeType {
    #[default]
    SharedFile,
    ConfigFile,
}

impl From<String> for VolumeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "config-file" => Self::ConfigFile,
            _ => Self::SharedFile,
        }
    }
}

impl From<VolumeType> for String {
    fn from(value: VolumeType) -> Self {
        match value {
            VolumeType::SharedFile => "share-file".to_string(),
            VolumeType::ConfigFile => "config-file".to_string(),
        }
    }
}

/// Edge from a component to another one it depends on.
///
/// `target_key` matches either the target's `component_key` or `share_id`.
/// When both `volume_name` and `mount_path` are set, the dependent also
/// mounts the named volume owned by the target.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DependencyRef {
    #[serde(alias = "dep_service_key")]
    pub target_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
}

/// Auxiliary image attached to components; only its image is shipped.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Plugin {
    #[serde(alias = "plugin_name")]
    pub name: String,

    #[serde(default, alias = "share_image")]
    pub image: String,

    #[serde(default, alias = "plugin_image")]
    pub image_hub: ImageHub,
}

/// Flat configuration injected into the env files of matching components.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConfigGroup {
    #[serde(default)]
    pub component_keys: Vec<String>,

    #[serde(default, alias = "config_items")]
    pub items: BTreeMap<String, String>,
}

impl Application {
    /// Parse an application model from a JSON string.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let app: Self =
            serde_json::from_str(json).map_err(|error| crate::Error::InvalidJson { error })?;
        app.validate()?;
        Ok(app)
    }

    /// Check that every component has a distinct share id.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for component in &self.components {
            if !seen.insert(component.share_id.as_str()) {
                return Err(crate::Error::InvalidModel {
                    reason: format!(
                        "share id '{}' is used by more than one component",
                        component.share_id
                    ),
                });
            }
        }
        Ok(())
    }

    /// Load an application model from a `metadata.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|error| crate::Error::InvalidJson { error })
    }

    /// Remove registry credentials from every component and plugin.
    pub fn strip_credentials(&mut self) {
        for component in &mut self.components {
            component.image_hub = ImageHub::default();
        }
        for plugin in &mut self.plugins {
            plugin.image_hub = ImageHub::default();
        }
    }

    /// Find the component a dependency key points at.
    pub fn find_component(&self, key: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.component_key == key || c.share_id == key)
    }

    /// Config group items that apply to a component, in group order.
    pub fn config_items_for<'a>(
        &'a self,
        component: &'a Component,
    ) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        self.app_config_groups
            .iter()
            .filter(move |g| g.component_keys.iter().any(|k| *k == component.component_key))
            .flat_map(|g| g.items.iter())
    }
}
