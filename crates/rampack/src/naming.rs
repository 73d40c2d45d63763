// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Service name resolution.
//!
//! Display names are turned into names that are safe to use as compose
//! service keys, container names, and directory names: Han characters are
//! romanized, anything outside `[a-zA-Z0-9._-]` becomes `_`, and collisions
//! within one run get a short random suffix.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use pinyin::ToPinyin;
use rand::Rng;
use regex::Regex;

#[cfg(test)]
#[path = "./naming_test.rs"]
mod naming_test;

/// Name used when a display name sanitizes to nothing.
pub const FALLBACK_NAME: &str = "service";

const SUFFIX_LEN: usize = 4;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\\?u([0-9a-fA-F]{4})").expect("Invalid unicode escape regex"));

/// Decode literal `\uXXXX` (or doubly escaped `\\uXXXX`) escapes and trim surrounding whitespace.
///
/// Upstream tooling sometimes stores display names with their non-ASCII
/// characters escaped; sequences that do not form a valid character are
/// kept as-is.
pub fn decode_unicode_escapes(text: &str) -> String {
    let decoded = UNICODE_ESCAPE.replace_all(text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    decoded.trim().to_string()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Map a display name onto `[a-zA-Z0-9._-]*` without any uniqueness check.
pub fn sanitize(raw: &str) -> String {
    let text = decode_unicode_escapes(raw);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_allowed(c) {
            out.push(c);
        } else if let Some(p) = c.to_pinyin() {
            // lü and nü romanize with a diaeresis; `v` is the usual ASCII spelling
            out.extend(p.plain().chars().map(|r| match r {
                'ü' => 'v',
                r if is_allowed(r) => r,
                _ => '_',
            }));
        } else {
            out.push('_');
        }
    }
    tracing::trace!(raw, name = %out, "sanitized service name");
    out
}

/// Assigns unique service names across one export run.
#[derive(Debug, Default)]
pub struct NameResolver {
    assigned: HashSet<String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a display name to a service name not yet handed out by this
    /// resolver.
    pub fn resolve(&mut self, raw: &str) -> String {
        let mut name = sanitize(raw);
        if name.is_empty() {
            name = FALLBACK_NAME.to_string();
        }
        if self.assigned.contains(&name) {
            let base = name;
            loop {
                let candidate = format!("{base}-{}", random_suffix());
                if !self.assigned.contains(&candidate) {
                    tracing::debug!(name = %base, resolved = %candidate, "service name collision");
                    name = candidate;
                    break;
                }
            }
        }
        self.assigned.insert(name.clone());
        name
    }

    /// Names assigned so far.
    pub fn assigned(&self) -> &HashSet<String> {
        &self.assigned
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}
