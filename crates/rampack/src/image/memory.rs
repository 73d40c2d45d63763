// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`ImageClient`] for tests.
//!
//! Holds a fake remote registry and a fake local store. `save` writes a real
//! docker-save shaped tarball so exports can be unpacked, imported, and
//! slug-extracted without a container engine.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ClientError, ClientResult, Credentials, ImageClient};
use crate::manifest::{ImageArchive, MANIFEST_FILENAME, ManifestEntry};
use crate::reference::ImageReference;

/// Layers of a fake image, bottom first; each is an uncompressed tarball.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeImage {
    pub layers: Vec<Vec<u8>>,
}

impl FakeImage {
    pub fn with_layers(layers: Vec<Vec<u8>>) -> Self {
        Self { layers }
    }
}

#[derive(Debug, Default)]
struct State {
    registry: HashMap<String, FakeImage>,
    local: HashMap<String, FakeImage>,
    pushed: Vec<(String, Option<String>)>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<State>,
}

fn key(reference: &str) -> String {
    ImageReference::parse(reference)
        .map(|r| r.full_reference())
        .unwrap_or_else(|_| reference.to_string())
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `reference` available for pulling.
    pub fn publish(&self, reference: &str, image: FakeImage) {
        self.lock().registry.insert(key(reference), image);
    }

    pub fn has_local(&self, reference: &str) -> bool {
        self.lock().local.contains_key(&key(reference))
    }

    pub fn has_remote(&self, reference: &str) -> bool {
        self.lock().registry.contains_key(&key(reference))
    }

    /// `(reference, username)` of every push, in order.
    pub fn pushed(&self) -> Vec<(String, Option<String>)> {
        self.lock().pushed.clone()
    }

    /// Every call as `"<op> <args>"`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

/// Build an uncompressed tarball holding `files`.
pub fn layer_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Write a docker-save style archive holding `images` under their tags.
pub fn write_image_archive(dest: &Path, images: &[(String, FakeImage)]) -> std::io::Result<()> {
    let file = std::fs::File::create(dest)?;
    let mut builder = tar::Builder::new(file);
    let mut manifest = Vec::new();
    for (i, (tag, image)) in images.iter().enumerate() {
        let config = format!("image{i}.json");
        append(&mut builder, &config, b"{}")?;
        let mut layers = Vec::new();
        for (j, layer) in image.layers.iter().enumerate() {
            let path = format!("layer{i}-{j}/layer.tar");
            append(&mut builder, &path, layer)?;
            layers.push(path);
        }
        manifest.push(ManifestEntry {
            config,
            repo_tags: vec![tag.clone()],
            layers,
        });
    }
    let manifest = serde_json::to_vec(&manifest)?;
    append(&mut builder, MANIFEST_FILENAME, &manifest)?;
    builder.into_inner()?;
    Ok(())
}

fn append<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, data)
}

#[async_trait]
impl ImageClient for MemoryClient {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn pull(
        &self,
        reference: &str,
        _credentials: Option<&Credentials>,
        _timeout: Option<Duration>,
    ) -> ClientResult<String> {
        let mut state = self.lock();
        state.calls.push(format!("pull {reference}"));
        let image = state
            .registry
            .get(&key(reference))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(reference.to_string()))?;
        state.local.insert(key(reference), image);
        Ok(reference.to_string())
    }

    async fn save(&self, destination: &Path, references: &[String]) -> ClientResult<()> {
        let images = {
            let mut state = self.lock();
            state
                .calls
                .push(format!("save {}", references.join(" ")));
            references
                .iter()
                .map(|r| {
                    state
                        .local
                        .get(&key(r))
                        .cloned()
                        .map(|image| (r.clone(), image))
                        .ok_or_else(|| ClientError::NotFound(r.clone()))
                })
                .collect::<ClientResult<Vec<_>>>()?
        };
        write_image_archive(destination, &images)?;
        Ok(())
    }

    async fn load(&self, source: &Path) -> ClientResult<()> {
        let scratch = tempfile::tempdir()?;
        crate::archive::unpack(source, scratch.path())
            .map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        let archive = ImageArchive::open(scratch.path())
            .map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        let mut state = self.lock();
        state.calls.push(format!("load {}", source.display()));
        for entry in archive.entries() {
            let layers = entry
                .layers
                .iter()
                .map(|l| std::fs::read(scratch.path().join(l)))
                .collect::<std::io::Result<Vec<_>>>()?;
            for tag in &entry.repo_tags {
                state.local.insert(key(tag), FakeImage::with_layers(layers.clone()));
            }
        }
        Ok(())
    }

    async fn push(
        &self,
        reference: &str,
        credentials: Option<&Credentials>,
        _timeout: Option<Duration>,
    ) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("push {reference}"));
        let image = state
            .local
            .get(&key(reference))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(reference.to_string()))?;
        state.registry.insert(key(reference), image);
        state
            .pushed
            .push((reference.to_string(), credentials.map(|c| c.username.clone())));
        Ok(())
    }

    async fn tag(&self, source: &str, target: &str) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(format!("tag {source} {target}"));
        let image = state
            .local
            .get(&key(source))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(source.to_string()))?;
        state.local.insert(key(target), image);
        Ok(())
    }
}
