// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_parse_full_config() {
    let yaml = r#"
api: rampack/v0
home: /srv/rampack
work_dir: /var/tmp/rp
backend: containerd
containerd_namespace: apps
pull_timeout_secs: 30
push_timeout_secs: 60
slug_layer: "2"
registry:
  url: image.example.com
  user: admin
  password: secret
  namespace: team
"#;
    let config = PackagerConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.home_dir(), PathBuf::from("/srv/rampack"));
    assert_eq!(config.work_root(), PathBuf::from("/var/tmp/rp"));
    assert_eq!(config.backend, ImageBackend::Containerd);
    assert_eq!(config.containerd_namespace, "apps");
    assert_eq!(config.pull_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(config.push_timeout(), Some(Duration::from_secs(60)));
    assert_eq!(config.slug_layer, LayerSelector::Index(2));

    let hub = config.registry.to_image_hub();
    assert_eq!(hub.hub_url, "image.example.com");
    assert_eq!(hub.namespace, "team");
    assert!(!format!("{:?}", config.registry).contains("secret"));
}

#[rstest]
#[case("")]
#[case("api: rampack/v0\n")]
#[case("backend: docker\n")]
fn test_defaults(#[case] yaml: &str) {
    let config = PackagerConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.backend, ImageBackend::Docker);
    assert_eq!(config.containerd_namespace, "k8s.io");
    assert_eq!(config.slug_layer, LayerSelector::Last);
    assert_eq!(config.pull_timeout(), None);
    assert!(config.registry.url.is_empty());
    assert!(config.home_dir().ends_with(DEFAULT_HOME_DIR));
    assert!(config.work_root().ends_with("rampack"));
}

#[rstest]
#[case("api: rampack/v9\n")]
#[case("backend: podman\n")]
#[case("slug_layer: top\n")]
#[case("registry: [1, 2]\n")]
fn test_invalid_config(#[case] yaml: &str) {
    let result = PackagerConfig::from_yaml(yaml);
    assert!(matches!(result, Err(crate::Error::InvalidYaml { .. })), "{yaml}");
}

#[rstest]
fn test_load_from_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("rampack.yaml");
    std::fs::write(&path, "home: /data\nslug_layer: last\n").unwrap();
    let config = PackagerConfig::load(&path).unwrap();
    assert_eq!(config.home_dir(), PathBuf::from("/data"));

    let missing = PackagerConfig::load(tmp.path().join("nope.yaml"));
    assert!(matches!(missing, Err(crate::Error::ReadFailed { .. })));
}

#[rstest]
fn test_expand_home() {
    assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    assert_eq!(expand_home("relative"), PathBuf::from("relative"));
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home("~/x"), home.join("x"));
        assert_eq!(expand_home("~"), home);
    }
}

#[rstest]
fn test_ensure_dir_creates_and_canonicalizes() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("a/b/../c");
    let out = ensure_dir(&dir).unwrap();
    assert!(out.is_dir());
    assert!(out.ends_with("a/c"));
}
