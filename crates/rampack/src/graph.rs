// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Component graph resolution.
//!
//! Ties names, volumes, environments, and dependency edges together into
//! one view of the application that the exporters render from.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::env::{self, TokenCache};
use crate::model::{Application, Component};
use crate::naming::NameResolver;
use crate::volumes::{MountSpec, VolumePlan};

#[cfg(test)]
#[path = "./graph_test.rs"]
mod graph_test;

/// A component with everything resolved for rendering.
#[derive(Debug, Clone)]
pub struct ResolvedService<'a> {
    pub component: &'a Component,
    pub name: String,
    pub mounts: Vec<MountSpec>,
    pub environment: BTreeMap<String, String>,
    /// Resolved names of dependency targets, deduplicated, in declaration order.
    pub depends_on: Vec<String>,
}

/// The whole application after name, volume, and env resolution.
#[derive(Debug, Clone)]
pub struct ResolvedApp<'a> {
    pub app: &'a Application,
    pub services: Vec<ResolvedService<'a>>,
    pub volumes: VolumePlan,
    names: IndexMap<String, String>,
}

impl<'a> ResolvedApp<'a> {
    /// Resolve an application, drawing sentinel tokens from `tokens`.
    pub fn resolve(app: &'a Application, tokens: &mut TokenCache) -> Self {
        let names = resolve_names(app);
        let volumes = VolumePlan::build(app, &names);

        let services = app
            .components
            .iter()
            .map(|component| {
                let name = names
                    .get(&component.share_id)
                    .cloned()
                    .unwrap_or_default();
                let mut depends_on: Vec<String> = Vec::new();
                for dep in &component.dependencies {
                    let Some(target) = app.find_component(&dep.target_key) else {
                        continue;
                    };
                    if let Some(target_name) = names.get(&target.share_id) {
                        if !depends_on.contains(target_name) {
                            depends_on.push(target_name.clone());
                        }
                    }
                }
                tracing::debug!(component = %component.share_id, service = %name, "resolved service");
                ResolvedService {
                    component,
                    mounts: volumes.mounts(&component.share_id).to_vec(),
                    environment: env::resolve_component(app, component, tokens),
                    depends_on,
                    name,
                }
            })
            .collect();

        Self {
            app,
            services,
            volumes,
            names,
        }
    }

    /// Resolved service name for a share id.
    pub fn service_name(&self, share_id: &str) -> Option<&str> {
        self.names.get(share_id).map(String::as_str)
    }
}

/// Assign a unique service name to every component, keyed by share id, in
/// component order.
pub fn resolve_names(app: &Application) -> IndexMap<String, String> {
    let mut resolver = NameResolver::new();
    app.components
        .iter()
        .map(|c| (c.share_id.clone(), resolver.resolve(&c.display_name)))
        .collect()
}
