// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

use rstest::rstest;

use super::*;

fn is_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[rstest]
#[case("web", "web")]
#[case("my-app_1.0", "my-app_1.0")]
#[case("my app", "my_app")]
#[case("db/primary", "db_primary")]
#[case("数据库", "shujuku")]
#[case("中文app", "zhongwenapp")]
#[case("  padded  ", "padded")]
#[case("café", "caf_")]
fn test_sanitize(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(sanitize(raw), expected);
}

#[rstest]
#[case(r"\u4e2d\u6587", "中文")]
#[case(r"\\u4e2d\\u6587", "中文")]
#[case(r"  中x ", "中x")]
#[case(r"plain", "plain")]
#[case(r"\uZZZZ", r"\uZZZZ")]
fn test_decode_unicode_escapes(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(decode_unicode_escapes(raw), expected);
}

#[rstest]
#[case("绿", "lv")]
#[case("女", "nv")]
#[case("绿女", "lvnv")]
fn test_sanitize_umlaut_syllables(#[case] raw: &str, #[case] expected: &str) {
    let name = sanitize(raw);
    assert_eq!(name, expected);
    assert!(is_safe(&name), "unsafe name {name}");
}

#[rstest]
fn test_sanitize_escaped_han() {
    assert_eq!(sanitize(r"\u4e2d\u6587"), "zhongwen");
}

#[rstest]
fn test_resolve_unique_names() {
    let mut resolver = NameResolver::new();
    let inputs = ["web", "web", "web", "数据库", "数据库", "a b", "a_b", "", ""];
    let names: Vec<String> = inputs.iter().map(|raw| resolver.resolve(raw)).collect();

    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len(), "names must be distinct: {names:?}");
    for name in &names {
        assert!(is_safe(name), "unsafe name {name}");
    }
    assert_eq!(names[0], "web");
    assert!(names[1].starts_with("web-"));
    assert_eq!(names[1].len(), "web-".len() + 4);
    assert_eq!(names[3], "shujuku");
    assert_eq!(names[7], FALLBACK_NAME);
}

#[rstest]
fn test_resolve_is_stable_without_collisions() {
    let inputs = ["api", "worker", "缓存"];
    let first: Vec<String> = {
        let mut resolver = NameResolver::new();
        inputs.iter().map(|raw| resolver.resolve(raw)).collect()
    };
    let second: Vec<String> = {
        let mut resolver = NameResolver::new();
        inputs.iter().map(|raw| resolver.resolve(raw)).collect()
    };
    assert_eq!(first, second);
    assert_eq!(first, vec!["api", "worker", "huancun"]);
}

#[rstest]
fn test_resolver_tracks_assigned() {
    let mut resolver = NameResolver::new();
    resolver.resolve("one");
    resolver.resolve("two");
    assert!(resolver.assigned().contains("one"));
    assert!(resolver.assigned().contains("two"));
    assert_eq!(resolver.assigned().len(), 2);
}
