// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Slug bundles.
//!
//! For every source-built component the build output is copied out of its
//! image into `<service>/<service>-slug.tgz`, next to a `<service>.env` and
//! a `<service>.sh` control script. A root `<app>.sh` drives all of them.
//! The saved image archive is removed once everything is extracted.

use std::path::Path;

use crate::env::TokenCache;
use crate::graph::ResolvedApp;
use crate::manifest::{ImageArchive, LayerSelector};
use crate::model::{Application, Component, GENERATE_SENTINEL};
use crate::naming;
use crate::scripts::{SLUG_APP_SCRIPT, SLUG_COMPONENT_SCRIPT, write_script};
use crate::{COMPONENT_IMAGES_TAR, Error, Result};

/// Directory the component image archive is unpacked into.
const UNPACKED_IMAGES_DIR: &str = "component-images";

/// What to extract for one source-built component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugComponent {
    pub name: String,
    pub image: String,
    pub env_file: String,
}

/// Everything the slug writer needs, detached from the application model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugPlan {
    pub app_script: String,
    pub components: Vec<SlugComponent>,
}

impl SlugPlan {
    pub fn build(resolved: &ResolvedApp<'_>, tokens: &mut TokenCache) -> Self {
        let mut components = Vec::new();
        for service in &resolved.services {
            let component = service.component;
            if !component.is_source_built() {
                continue;
            }
            if component.image.is_empty() {
                tracing::warn!(component = %component.display_name, "source-built component has no image, no slug to extract");
                continue;
            }
            components.push(SlugComponent {
                name: service.name.clone(),
                image: component.image.clone(),
                env_file: env_file(resolved.app, component, tokens),
            });
        }
        let mut app_script = naming::sanitize(&resolved.app.app_name);
        if app_script.is_empty() {
            app_script = "app".to_string();
        }
        Self {
            app_script: format!("{app_script}.sh"),
            components,
        }
    }

    /// Extract every slug from `<dir>/component-images.tar` and write the
    /// scripts.
    pub fn write(&self, dir: &Path, layer: LayerSelector) -> Result<()> {
        let images_tar = dir.join(COMPONENT_IMAGES_TAR);
        let unpacked = dir.join(UNPACKED_IMAGES_DIR);

        if !self.components.is_empty() {
            if !images_tar.is_file() {
                return Err(Error::ManifestParse {
                    path: images_tar,
                    reason: "component image archive was not saved".to_string(),
                });
            }
            crate::archive::unpack(&images_tar, &unpacked)?;
            let archive = ImageArchive::open(&unpacked)?;
            let scratch = tempfile::Builder::new()
                .prefix(".slug-")
                .tempdir_in(dir)?;

            for component in &self.components {
                self.write_component(&archive, component, dir, scratch.path(), layer)?;
            }
            scratch.close()?;
        }

        remove_if_present(&images_tar)?;
        remove_if_present(&unpacked)?;

        write_script(&dir.join(&self.app_script), SLUG_APP_SCRIPT)?;
        tracing::info!(components = self.components.len(), "wrote slug bundle");
        Ok(())
    }

    fn write_component(
        &self,
        archive: &ImageArchive,
        component: &SlugComponent,
        dir: &Path,
        scratch: &Path,
        layer: LayerSelector,
    ) -> Result<()> {
        let service_dir = dir.join(&component.name);
        std::fs::create_dir_all(&service_dir).map_err(|error| Error::WriteFailed {
            path: service_dir.clone(),
            error,
        })?;

        let slug = service_dir.join(format!("{}-slug.tgz", component.name));
        archive.extract_slug(&component.image, layer, &scratch.join(&component.name), &slug)?;
        tracing::info!(component = %component.name, image = %component.image, "extracted slug");

        let env_path = service_dir.join(format!("{}.env", component.name));
        std::fs::write(&env_path, &component.env_file).map_err(|error| Error::WriteFailed {
            path: env_path,
            error,
        })?;
        write_script(
            &service_dir.join(format!("{}.sh", component.name)),
            SLUG_COMPONENT_SCRIPT,
        )
    }
}

/// `export KEY=VALUE` lines for a slug component: declared envs, config
/// group items, connection envs, then `PORT`.
///
/// Values are written single-quoted and otherwise as declared, except that
/// `**None**` becomes the run's token for that key.
pub fn env_file(app: &Application, component: &Component, tokens: &mut TokenCache) -> String {
    let mut out = String::new();
    let mut export = |key: &str, value: &str| {
        let value = if value == GENERATE_SENTINEL {
            tokens.token_for(key).to_string()
        } else {
            value.to_string()
        };
        out.push_str(&format!("export {key}={}\n", shell_quote(&value)));
    };
    for env in &component.envs {
        export(&env.name, &env.value);
    }
    for (key, value) in app.config_items_for(component) {
        export(key, value);
    }
    for env in &component.connection_envs {
        export(&env.name, &env.value);
    }
    if let Some(port) = component.primary_port() {
        export(crate::env::PORT_VAR, &port.to_string());
    }
    out
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn remove_if_present(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.map_err(|error| Error::WriteFailed {
        path: path.to_path_buf(),
        error,
    })
}
