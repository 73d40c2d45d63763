// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Image reference parsing and registry retargeting.
//!
//! Parses references like `hub.example.com/ns/app:v1` into their parts so
//! that short and fully-qualified names compare equal, and so an image can be
//! renamed under another registry on import.

use crate::{Error, Result};

#[cfg(test)]
#[path = "./reference_test.rs"]
mod reference_test;

/// Registry assumed when a reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when a reference has neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

/// Parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// Registry hostname, with port if any (e.g. `docker.io`, `localhost:5000`)
    pub registry: String,
    /// Repository path (e.g. `library/nginx`, `ns/app`)
    pub repository: String,
    pub tag: Option<String>,
    /// Digest (e.g. `sha256:abc...`)
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// - `nginx` → `docker.io/library/nginx:latest`
    /// - `user/app:1.0` → `docker.io/user/app:1.0`
    /// - `localhost:5000/app` → `localhost:5000/app:latest`
    /// - `hub.example.com/ns/app@sha256:abc` keeps the digest and gets no tag
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(invalid(reference, "empty image reference"));
        }

        let (name_tag, digest) = match reference.rsplit_once('@') {
            Some((name, digest)) => {
                if !digest.contains(':') {
                    return Err(invalid(reference, "digest must be algorithm:hex"));
                }
                (name, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // A tag can only follow the last path separator; a colon before it
        // belongs to a registry port.
        let last_segment_start = name_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_segment_start..].rfind(':') {
            Some(colon) => {
                let colon = last_segment_start + colon;
                let tag = &name_tag[colon + 1..];
                if tag.is_empty() {
                    return Err(invalid(reference, "empty tag"));
                }
                (&name_tag[..colon], Some(tag.to_string()))
            }
            None => (name_tag, None),
        };

        let (registry, repository) = split_registry(name).ok_or_else(|| invalid(reference, "empty repository"))?;

        let tag = match (&tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// The fully-qualified reference string.
    pub fn full_reference(&self) -> String {
        let mut s = format!("{}/{}", self.registry, self.repository);
        if let Some(tag) = &self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(digest) = &self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    /// Whether two references name the same image once defaults are applied.
    pub fn same_image(&self, other: &ImageReference) -> bool {
        self == other
    }

    /// Rename this image under another registry and namespace.
    ///
    /// The registry host is replaced, and the first repository segment (the
    /// old namespace) is dropped when the repository has more than one
    /// segment. The tag is kept, defaulting to `latest`.
    pub fn retarget(&self, hub_url: &str, namespace: &str) -> String {
        let name = match self.repository.split_once('/') {
            Some((_, rest)) => rest,
            None => self.repository.as_str(),
        };
        let hub_url = hub_url.trim_end_matches('/');
        let mut s = if namespace.is_empty() {
            format!("{hub_url}/{name}")
        } else {
            format!("{hub_url}/{namespace}/{name}")
        };
        match (&self.tag, &self.digest) {
            (Some(tag), _) => {
                s.push(':');
                s.push_str(tag);
            }
            (None, Some(digest)) => {
                s.push('@');
                s.push_str(digest);
            }
            (None, None) => {
                s.push(':');
                s.push_str(DEFAULT_TAG);
            }
        }
        s
    }
}

impl std::str::FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

/// Compare two reference strings after normalization. Unparseable input
/// falls back to exact string comparison.
pub fn same_image(a: &str, b: &str) -> bool {
    match (ImageReference::parse(a), ImageReference::parse(b)) {
        (Ok(a), Ok(b)) => a.same_image(&b),
        _ => a == b,
    }
}

fn split_registry(name: &str) -> Option<(String, String)> {
    if let Some((first, rest)) = name.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            if rest.is_empty() {
                return None;
            }
            if first == DEFAULT_REGISTRY && !rest.contains('/') {
                return Some((first.to_string(), format!("library/{rest}")));
            }
            return Some((first.to_string(), rest.to_string()));
        }
    }
    if name.is_empty() {
        return None;
    }
    let repository = if name.contains('/') {
        name.to_string()
    } else {
        format!("library/{name}")
    };
    Some((DEFAULT_REGISTRY.to_string(), repository))
}

fn invalid(reference: &str, reason: &str) -> Error {
    Error::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}
