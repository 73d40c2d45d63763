// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Environment merging and `${KEY[:default]}` template resolution.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};

use crate::model::{Application, Component, GENERATE_SENTINEL};

#[cfg(test)]
#[path = "./env_test.rs"]
mod env_test;

/// Injected with the first declared container port.
pub const PORT_VAR: &str = "PORT";

/// Injected with the memory class label of the component.
pub const MEMORY_SIZE_VAR: &str = "MEMORY_SIZE";

const TOKEN_LEN: usize = 8;
const TOKEN_CHARSET: &[u8] = b"0123456789abcdef";

static TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]*)(?::([^}]*))?\}").expect("Invalid env template regex")
});

/// Memory class label for an initial memory size in MiB.
///
/// Sizes outside the table map to `small`.
pub fn memory_label(mib: u32) -> &'static str {
    match mib {
        128 => "micro",
        256 => "small",
        512 => "medium",
        1024 => "large",
        2048 => "2xlarge",
        4096 => "4xlarge",
        8192 => "8xlarge",
        16384 => "16xlarge",
        32768 => "32xlarge",
        65536 => "64xlarge",
        _ => "small",
    }
}

/// Random tokens generated for `**None**` values, memoized by env name for
/// the duration of one run.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: HashMap<String, String>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The token for `key`, generating it on first use.
    pub fn token_for(&mut self, key: &str) -> &str {
        self.tokens
            .entry(key.to_string())
            .or_insert_with(generate_token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Substitute every `${KEY}` and `${KEY:default}` in `value` once.
///
/// A key present in `vars` wins over the default. Without either the
/// placeholder is left untouched. Substituted text is never expanded again.
pub fn render(value: &str, vars: &BTreeMap<String, String>) -> String {
    TEMPLATE
        .replace_all(value, |caps: &Captures<'_>| {
            if let Some(found) = vars.get(&caps[1]) {
                return found.clone();
            }
            match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Expand sentinels, then render every value against a snapshot of the
/// merged mapping.
pub fn resolve(merged: IndexMap<String, String>, tokens: &mut TokenCache) -> BTreeMap<String, String> {
    let snapshot: BTreeMap<String, String> = merged
        .into_iter()
        .map(|(key, value)| {
            if value == GENERATE_SENTINEL {
                let token = tokens.token_for(&key).to_string();
                (key, token)
            } else {
                (key, value)
            }
        })
        .collect();

    snapshot
        .iter()
        .map(|(key, value)| (key.clone(), render(value, &snapshot)))
        .collect()
}

/// Merge the raw environment of a component, later entries winning:
/// declared envs, its own connection envs, the connection envs of every
/// dependency target, then `PORT` and `MEMORY_SIZE`.
pub fn merge_component_envs(app: &Application, component: &Component) -> IndexMap<String, String> {
    let mut merged = IndexMap::new();
    for env in component.envs.iter().chain(&component.connection_envs) {
        merged.insert(env.name.clone(), env.value.clone());
    }
    for dep in &component.dependencies {
        match app.find_component(&dep.target_key) {
            Some(target) => {
                for env in &target.connection_envs {
                    merged.insert(env.name.clone(), env.value.clone());
                }
            }
            None => tracing::debug!(
                component = %component.share_id,
                target = %dep.target_key,
                "dependency target not found, no connection envs merged"
            ),
        }
    }
    if let Some(port) = component.primary_port() {
        merged.insert(PORT_VAR.to_string(), port.to_string());
    }
    merged.insert(
        MEMORY_SIZE_VAR.to_string(),
        memory_label(component.memory).to_string(),
    );
    merged
}

/// Resolved environment of one component.
pub fn resolve_component(
    app: &Application,
    component: &Component,
    tokens: &mut TokenCache,
) -> BTreeMap<String, String> {
    resolve(merge_component_envs(app, component), tokens)
}
