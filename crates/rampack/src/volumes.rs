// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Volume graph: per-service mount lists and the global volume set.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::model::Application;

#[cfg(test)]
#[path = "./volumes_test.rs"]
mod volumes_test;

/// One `<source>:<mount_path>` entry of a service's volume list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: String,
    pub mount_path: String,
}

impl std::fmt::Display for MountSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.mount_path)
    }
}

/// A config-file volume whose content ships inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub service_name: String,
    pub mount_path: String,
    pub content: String,
}

impl ConfigFile {
    /// Location of the file relative to the export root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.service_name).join(self.mount_path.trim_start_matches('/'))
    }

    /// [`Self::relative_path`], rejecting mount paths that would leave the
    /// service directory.
    pub fn checked_path(&self) -> crate::Result<PathBuf> {
        let inner = Path::new(self.mount_path.trim_start_matches('/'));
        let mut normal = 0;
        for part in inner.components() {
            match part {
                Component::Normal(_) => normal += 1,
                Component::CurDir => {}
                _ => {
                    return Err(crate::Error::InvalidModel {
                        reason: format!(
                            "config file {} of {} leaves the service directory",
                            self.mount_path, self.service_name
                        ),
                    });
                }
            }
        }
        if normal == 0 {
            return Err(crate::Error::InvalidModel {
                reason: format!("config file of {} has no mount path", self.service_name),
            });
        }
        Ok(self.relative_path())
    }
}

/// Resolved volumes for every component of an application.
#[derive(Debug, Clone, Default)]
pub struct VolumePlan {
    mounts: HashMap<String, Vec<MountSpec>>,
    global_volumes: Vec<String>,
    config_files: Vec<ConfigFile>,
}

impl VolumePlan {
    /// Build the plan from an application and its resolved service names,
    /// keyed by share id.
    ///
    /// Own volumes are resolved for every component before any dependency
    /// mount is looked up, so the order of components does not matter.
    pub fn build(app: &Application, names: &IndexMap<String, String>) -> Self {
        tracing::debug!(app = %app.app_name, "building volume plan");
        let mut plan = Self::default();
        let mut sources: HashMap<(&str, &str), String> = HashMap::new();

        for component in &app.components {
            let service_name = names
                .get(&component.share_id)
                .map(String::as_str)
                .unwrap_or_default();
            let mut mounts = Vec::with_capacity(component.volumes.len());
            for volume in &component.volumes {
                let source = if volume.is_config_file() {
                    let file = ConfigFile {
                        service_name: service_name.to_string(),
                        mount_path: volume.mount_path.clone(),
                        content: volume.file_content.clone(),
                    };
                    let source = format!("./{}", file.relative_path().display());
                    plan.config_files.push(file);
                    source
                } else {
                    let source = format!("{service_name}_{}", volume.name);
                    plan.global_volumes.push(source.clone());
                    source
                };
                sources.insert(
                    (component.share_id.as_str(), volume.name.as_str()),
                    source.clone(),
                );
                mounts.push(MountSpec {
                    source,
                    mount_path: volume.mount_path.clone(),
                });
            }
            plan.mounts.insert(component.share_id.clone(), mounts);
        }

        for component in &app.components {
            for dep in &component.dependencies {
                let (Some(volume_name), Some(mount_path)) = (&dep.volume_name, &dep.mount_path)
                else {
                    continue;
                };
                let source = app
                    .find_component(&dep.target_key)
                    .and_then(|target| sources.get(&(target.share_id.as_str(), volume_name.as_str())));
                let Some(source) = source else {
                    tracing::warn!(
                        component = %component.share_id,
                        target = %dep.target_key,
                        volume = %volume_name,
                        "dependent volume not found, skipping mount"
                    );
                    continue;
                };
                plan.mounts
                    .entry(component.share_id.clone())
                    .or_default()
                    .push(MountSpec {
                        source: source.clone(),
                        mount_path: mount_path.clone(),
                    });
            }
        }

        plan
    }

    /// Mounts for the component with the given share id, own volumes first.
    pub fn mounts(&self, share_id: &str) -> &[MountSpec] {
        self.mounts.get(share_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Named volumes declared at the top level of a compose file.
    pub fn global_volumes(&self) -> &[String] {
        &self.global_volumes
    }

    /// Config-file volumes to materialize inside the export directory.
    pub fn config_files(&self) -> &[ConfigFile] {
        &self.config_files
    }
}
