// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! rampack - Application Model Packager
//!
//! This crate turns a declarative multi-component application model
//! (`metadata.json`) into a deployable bundle, and imports offline bundles
//! back into a registry.
//!
//! # Overview
//!
//! Exports resolve the component graph first: every component gets a
//! unique service name ([`naming`]), a mount list ([`volumes`]) and a
//! rendered environment ([`env`]). The [`export::Exporter`] then pulls and
//! saves images through an [`image::ImageClient`] and writes one of three
//! formats:
//!
//! - `offline`: `metadata.json` plus `component-images.tar` and
//!   `plugins-images.tar`, importable with [`import::Importer`]
//! - `docker-compose`: `docker-compose.yaml` and a `run.sh`
//! - `slug`: build artifacts of source-built components with control scripts
//!
//! # Example
//!
//! ```json
//! {
//!   "app_name": "shop",
//!   "app_version": "1.0",
//!   "components": [
//!     {
//!       "share_id": "3f2a",
//!       "component_key": "web",
//!       "display_name": "web",
//!       "image": "hub.example.com/shop/web:1.0",
//!       "ports": [{"container_port": 5000}],
//!       "envs": [{"name": "URL", "value": "${HOST:localhost}:${PORT}"}]
//!     }
//!   ]
//! }
//! ```

pub mod archive;
pub mod config;
pub mod env;
pub mod error;
pub mod export;
pub mod graph;
pub mod image;
pub mod import;
pub mod manifest;
pub mod model;
pub mod naming;
pub mod reference;
pub mod scripts;
pub mod volumes;

pub use config::PackagerConfig;
pub use env::TokenCache;
pub use error::{Error, Result};
pub use export::{ExportFormat, ExportOptions, ExportResult, ExportStage, Exporter};
pub use graph::{ResolvedApp, ResolvedService};
pub use image::{ImageBackend, ImageClient};
pub use import::Importer;
pub use manifest::LayerSelector;
pub use model::{Application, Component, ImageHub};
pub use reference::ImageReference;

/// Well-known filename of the serialized application model.
pub const METADATA_FILENAME: &str = "metadata.json";

/// Archive of every component image inside an export directory.
pub const COMPONENT_IMAGES_TAR: &str = "component-images.tar";

/// Archive of every plugin image inside an offline export.
pub const PLUGIN_IMAGES_TAR: &str = "plugins-images.tar";
