// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Image archive manifests and slug extraction.
//!
//! An unpacked `docker save` (or `ctr images export`) archive holds a
//! `manifest.json` listing, per image, its tags and its layer tarballs from
//! bottom to top. Source-built images carry their build output in one of
//! those layers at [`SLUG_PATH`].

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::reference;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./manifest_test.rs"]
mod manifest_test;

pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Location of the build artifact inside the build-output layer.
pub const SLUG_PATH: &str = "tmp/slug/slug.tgz";

/// One image of a saved archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManifestEntry {
    #[serde(rename = "Config", default)]
    pub config: String,

    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Vec<String>,

    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,
}

impl ManifestEntry {
    /// Whether any tag names the same image as `reference`.
    pub fn is_tagged(&self, reference: &str) -> bool {
        self.repo_tags
            .iter()
            .any(|tag| reference::same_image(tag, reference))
    }
}

/// Which layer of an image holds the build output.
///
/// Builders used so far put it on top, so [`LayerSelector::Last`] is the
/// default. Other pipelines can name a zero-based index instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerSelector {
    #[default]
    Last,
    Index(usize),
}

impl LayerSelector {
    pub fn pick<'a>(&self, layers: &'a [String]) -> Option<&'a String> {
        match self {
            Self::Last => layers.last(),
            Self::Index(i) => layers.get(*i),
        }
    }
}

impl std::str::FromStr for LayerSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("last") {
            return Ok(Self::Last);
        }
        s.parse::<usize>()
            .map(Self::Index)
            .map_err(|_| format!("invalid layer selector '{s}', expected 'last' or an index"))
    }
}

impl TryFrom<String> for LayerSelector {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LayerSelector> for String {
    fn from(value: LayerSelector) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for LayerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Last => f.write_str("last"),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// An unpacked image archive.
#[derive(Debug, Clone)]
pub struct ImageArchive {
    root: PathBuf,
    entries: Vec<ManifestEntry>,
}

impl ImageArchive {
    /// Read `manifest.json` from an unpacked archive directory.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILENAME);
        let json = std::fs::read_to_string(&path).map_err(|e| Error::ManifestParse {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(&json).map_err(|e| Error::ManifestParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), images = entries.len(), "read image manifest");
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// First entry tagged with `reference`.
    pub fn find(&self, reference: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.is_tagged(reference))
    }

    /// Path of the layer tarball `selector` picks for `reference`.
    pub fn layer_path(&self, reference: &str, selector: LayerSelector) -> Result<PathBuf> {
        let manifest = self.root.join(MANIFEST_FILENAME);
        let entry = self.find(reference).ok_or_else(|| Error::ManifestParse {
            path: manifest.clone(),
            reason: format!("no image tagged {reference}"),
        })?;
        let layer = selector
            .pick(&entry.layers)
            .ok_or_else(|| Error::ManifestParse {
                path: manifest.clone(),
                reason: format!(
                    "image {reference} has {} layers, cannot select layer {selector}",
                    entry.layers.len()
                ),
            })?;
        let relative = Path::new(layer);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::ManifestParse {
                path: manifest,
                reason: format!("layer path {layer} leaves the archive"),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Unpack the selected layer of `reference` into `scratch` and copy the
    /// file at `inner_path` to `dest`.
    pub fn extract_from_layer(
        &self,
        reference: &str,
        selector: LayerSelector,
        inner_path: &str,
        scratch: &Path,
        dest: &Path,
    ) -> Result<()> {
        let layer = self.layer_path(reference, selector)?;
        tracing::debug!(image = %reference, layer = %layer.display(), "unpacking build-output layer");
        crate::archive::unpack(&layer, scratch)?;

        let source = scratch.join(inner_path);
        if !source.is_file() {
            return Err(Error::ManifestParse {
                path: layer,
                reason: format!("layer of {reference} does not contain {inner_path}"),
            });
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|error| Error::WriteFailed {
                path: parent.to_path_buf(),
                error,
            })?;
        }
        std::fs::copy(&source, dest).map_err(|error| Error::WriteFailed {
            path: dest.to_path_buf(),
            error,
        })?;
        Ok(())
    }

    /// Copy the slug of a source-built image to `dest`.
    pub fn extract_slug(
        &self,
        reference: &str,
        selector: LayerSelector,
        scratch: &Path,
        dest: &Path,
    ) -> Result<()> {
        self.extract_from_layer(reference, selector, SLUG_PATH, scratch, dest)
    }
}
