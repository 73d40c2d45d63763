// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use rstest::{fixture, rstest};

use super::*;
use crate::model::{Component, DependencyRef, Volume, VolumeType};

fn component(share_id: &str, volumes: Vec<Volume>, dependencies: Vec<DependencyRef>) -> Component {
    Component {
        share_id: share_id.to_string(),
        component_key: format!("{share_id}-key"),
        volumes,
        dependencies,
        ..Default::default()
    }
}

fn shared(name: &str, path: &str) -> Volume {
    Volume {
        name: name.to_string(),
        mount_path: path.to_string(),
        volume_type: VolumeType::SharedFile,
        file_content: String::new(),
    }
}

fn mount_dep(target: &str, volume: &str, path: &str) -> DependencyRef {
    DependencyRef {
        target_key: target.to_string(),
        volume_name: Some(volume.to_string()),
        mount_path: Some(path.to_string()),
    }
}

fn names(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[fixture]
fn two_components() -> Application {
    Application {
        app_name: "demo".to_string(),
        components: vec![
            component("b", vec![], vec![mount_dep("a", "data", "/mnt")]),
            component("a", vec![shared("data", "/var/data")], vec![]),
        ],
        ..Default::default()
    }
}

#[rstest]
fn test_own_volume_is_namespaced(two_components: Application) {
    let plan = VolumePlan::build(&two_components, &names(&[("a", "alpha"), ("b", "beta")]));
    let mounts: Vec<String> = plan.mounts("a").iter().map(|m| m.to_string()).collect();
    assert_eq!(mounts, vec!["alpha_data:/var/data"]);
    assert_eq!(plan.global_volumes(), &["alpha_data".to_string()]);
}

#[rstest]
fn test_dependency_volume_resolved_regardless_of_order(two_components: Application) {
    let plan = VolumePlan::build(&two_components, &names(&[("a", "alpha"), ("b", "beta")]));
    let mounts: Vec<String> = plan.mounts("b").iter().map(|m| m.to_string()).collect();
    assert_eq!(mounts, vec!["alpha_data:/mnt"]);
}

#[rstest]
fn test_dependency_by_component_key(two_components: Application) {
    let mut app = two_components;
    app.components[0].dependencies = vec![mount_dep("a-key", "data", "/shared")];
    let plan = VolumePlan::build(&app, &names(&[("a", "alpha"), ("b", "beta")]));
    assert_eq!(plan.mounts("b")[0].source, "alpha_data");
    assert_eq!(plan.mounts("b")[0].mount_path, "/shared");
}

#[rstest]
#[case("missing", "data")]
#[case("a", "nope")]
fn test_missing_dependency_volume_is_omitted(
    two_components: Application,
    #[case] target: &str,
    #[case] volume: &str,
) {
    let mut app = two_components;
    app.components[0].dependencies = vec![mount_dep(target, volume, "/mnt")];
    let plan = VolumePlan::build(&app, &names(&[("a", "alpha"), ("b", "beta")]));
    assert!(plan.mounts("b").is_empty());
    assert_eq!(plan.mounts("a").len(), 1);
}

#[rstest]
fn test_plain_dependency_adds_no_mount(two_components: Application) {
    let mut app = two_components;
    app.components[0].dependencies = vec![DependencyRef {
        target_key: "a".to_string(),
        volume_name: None,
        mount_path: None,
    }];
    let plan = VolumePlan::build(&app, &names(&[("a", "alpha"), ("b", "beta")]));
    assert!(plan.mounts("b").is_empty());
}

#[rstest]
fn test_config_file_volume_is_local() {
    let app = Application {
        components: vec![component(
            "a",
            vec![
                Volume {
                    name: "conf".to_string(),
                    mount_path: "/etc/nginx/nginx.conf".to_string(),
                    volume_type: VolumeType::ConfigFile,
                    file_content: "worker_processes 1;".to_string(),
                },
                shared("logs", "/var/log"),
            ],
            vec![],
        )],
        ..Default::default()
    };
    let plan = VolumePlan::build(&app, &names(&[("a", "web")]));

    let mounts: Vec<String> = plan.mounts("a").iter().map(|m| m.to_string()).collect();
    assert_eq!(
        mounts,
        vec!["./web/etc/nginx/nginx.conf:/etc/nginx/nginx.conf", "web_logs:/var/log"]
    );
    assert_eq!(plan.global_volumes(), &["web_logs".to_string()]);
    assert_eq!(plan.config_files().len(), 1);
    assert_eq!(
        plan.config_files()[0].relative_path(),
        PathBuf::from("web/etc/nginx/nginx.conf")
    );
}

#[rstest]
fn test_unknown_component_has_no_mounts() {
    let plan = VolumePlan::build(&Application::default(), &IndexMap::new());
    assert!(plan.mounts("ghost").is_empty());
    assert!(plan.global_volumes().is_empty());
}

#[rstest]
#[case("/etc/app/app.conf", true)]
#[case("conf/./app.conf", true)]
#[case("/../../../escaped.txt", false)]
#[case("/etc/../../up.conf", false)]
#[case("/", false)]
#[case("", false)]
fn test_config_file_checked_path(#[case] mount_path: &str, #[case] ok: bool) {
    let file = ConfigFile {
        service_name: "web".to_string(),
        mount_path: mount_path.to_string(),
        content: String::new(),
    };
    match file.checked_path() {
        Ok(path) => {
            assert!(ok, "{mount_path} should be rejected");
            assert!(path.starts_with("web"));
        }
        Err(err) => {
            assert!(!ok, "{mount_path} should be accepted: {err}");
            assert!(matches!(err, crate::Error::InvalidModel { .. }));
        }
    }
}
