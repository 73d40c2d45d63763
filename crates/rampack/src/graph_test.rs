// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};

use super::*;
use crate::model::{DependencyRef, EnvVar, GENERATE_SENTINEL, Volume};

fn dep(target: &str) -> DependencyRef {
    DependencyRef {
        target_key: target.to_string(),
        ..Default::default()
    }
}

#[fixture]
fn app() -> Application {
    Application {
        app_name: "shop".to_string(),
        app_version: "1.0".to_string(),
        components: vec![
            Component {
                share_id: "s-db".to_string(),
                component_key: "db".to_string(),
                display_name: "数据库".to_string(),
                connection_envs: vec![EnvVar::new("DB_PASS", GENERATE_SENTINEL)],
                volumes: vec![Volume {
                    name: "data".to_string(),
                    mount_path: "/var/lib/db".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            Component {
                share_id: "s-web".to_string(),
                component_key: "web".to_string(),
                display_name: "web".to_string(),
                envs: vec![EnvVar::new("DSN", "root:${DB_PASS}@db")],
                dependencies: vec![
                    dep("db"),
                    dep("s-db"),
                    DependencyRef {
                        target_key: "db".to_string(),
                        volume_name: Some("data".to_string()),
                        mount_path: Some("/backup".to_string()),
                    },
                ],
                ..Default::default()
            },
            Component {
                share_id: "s-web2".to_string(),
                component_key: "web2".to_string(),
                display_name: "web".to_string(),
                dependencies: vec![dep("web"), dep("db"), dep("unknown")],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

#[rstest]
fn test_resolve_names_in_component_order(app: Application) {
    let names = resolve_names(&app);
    let keys: Vec<&str> = names.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["s-db", "s-web", "s-web2"]);
    assert_eq!(names["s-db"], "shujuku");
    assert_eq!(names["s-web"], "web");
    assert_ne!(names["s-web2"], "web");
}

#[rstest]
fn test_depends_on_is_deduplicated(app: Application) {
    let mut tokens = TokenCache::new();
    let resolved = ResolvedApp::resolve(&app, &mut tokens);
    assert_eq!(resolved.services[1].depends_on, vec!["shujuku"]);

    let web2 = &resolved.services[2];
    assert_eq!(web2.depends_on, vec!["web".to_string(), "shujuku".to_string()]);
    assert!(resolved.services[0].depends_on.is_empty());
}

#[rstest]
fn test_shared_token_across_components(app: Application) {
    let mut tokens = TokenCache::new();
    let resolved = ResolvedApp::resolve(&app, &mut tokens);
    let db_pass = resolved.services[0].environment["DB_PASS"].clone();
    assert_eq!(db_pass.len(), 8);
    assert_eq!(resolved.services[1].environment["DB_PASS"], db_pass);
    assert_eq!(resolved.services[1].environment["DSN"], format!("root:{db_pass}@db"));
}

#[rstest]
fn test_mounts_and_global_volumes(app: Application) {
    let mut tokens = TokenCache::new();
    let resolved = ResolvedApp::resolve(&app, &mut tokens);
    let web_mounts: Vec<String> = resolved.services[1]
        .mounts
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(web_mounts, vec!["shujuku_data:/backup"]);
    assert_eq!(resolved.volumes.global_volumes(), &["shujuku_data".to_string()]);
    assert_eq!(resolved.service_name("s-web"), Some("web"));
    assert_eq!(resolved.service_name("nope"), None);
}
