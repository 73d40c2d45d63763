// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for rampack operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::export::ExportStage;

/// Convenience Result type with rampack Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, exporting, or importing an application.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Output directory could not be cleaned or created
    #[error("Failed to prepare directory {path:?}")]
    #[diagnostic(
        code(rampack::dir_prep),
        help("Check that the home directory exists and is writable")
    )]
    DirPrep {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Registry pull failed
    #[error("Failed to pull image {image} for {owner}: {reason}")]
    #[diagnostic(
        code(rampack::image_pull),
        help("Check the registry credentials and network access for this image")
    )]
    ImagePull {
        owner: String,
        image: String,
        reason: String,
    },

    /// Registry push failed
    #[error("Failed to push image {image}: {reason}")]
    #[diagnostic(code(rampack::image_push))]
    ImagePush { image: String, reason: String },

    /// Retag failed
    #[error("Failed to tag image {source_ref} as {target}: {reason}")]
    #[diagnostic(code(rampack::image_tag))]
    ImageTag {
        source_ref: String,
        target: String,
        reason: String,
    },

    /// Saving images into an archive failed
    #[error("Failed to save images {images:?} to {path:?}: {reason}")]
    #[diagnostic(code(rampack::image_save))]
    ImageSave {
        path: PathBuf,
        images: Vec<String>,
        reason: String,
    },

    /// Loading images from an archive failed
    #[error("Failed to load images from {path:?}: {reason}")]
    #[diagnostic(code(rampack::image_load))]
    ImageLoad { path: PathBuf, reason: String },

    /// Tar or zip read/write failure
    #[error("Archive operation failed on {path:?}")]
    #[diagnostic(code(rampack::archive))]
    Archive {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Image manifest missing or malformed during slug extraction
    #[error("Invalid image manifest {path:?}: {reason}")]
    #[diagnostic(
        code(rampack::manifest_parse),
        help("The component image archive must contain a docker-save style manifest.json")
    )]
    ManifestParse { path: PathBuf, reason: String },

    /// Final tar.gz packaging failed
    #[error("Failed to package {package}: {reason}")]
    #[diagnostic(code(rampack::packaging))]
    Packaging { package: String, reason: String },

    /// Invalid JSON application model
    #[error("Invalid application model: {error}")]
    #[diagnostic(
        code(rampack::invalid_json),
        help("The metadata document must be a JSON object with app_name, app_version, and components")
    )]
    InvalidJson {
        #[source]
        error: serde_json::Error,
    },

    /// Application model violates a structural rule
    #[error("Invalid application model: {reason}")]
    #[diagnostic(code(rampack::invalid_model))]
    InvalidModel { reason: String },

    /// Invalid YAML configuration file
    #[error("Invalid configuration file: {error}")]
    #[diagnostic(code(rampack::invalid_yaml))]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(rampack::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write file
    #[error("Failed to write file: {path:?}")]
    #[diagnostic(code(rampack::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Image reference could not be parsed
    #[error("Invalid image reference '{reference}': {reason}")]
    #[diagnostic(code(rampack::invalid_reference))]
    InvalidReference { reference: String, reason: String },

    /// Import requested without a target registry
    #[error("A target registry url is required to import an application")]
    #[diagnostic(code(rampack::missing_hub_url), help("Pass --hub-url or set registry.url"))]
    MissingHubUrl,

    /// Unknown export format string
    #[error("Unknown export format: {0}")]
    #[diagnostic(
        code(rampack::unknown_format),
        help("Expected one of: offline, docker-compose, slug")
    )]
    UnknownFormat(String),

    /// External command exceeded its timeout
    #[error("Command '{command}' timed out after {secs}s")]
    #[diagnostic(code(rampack::command_timeout))]
    CommandTimeout { command: String, secs: u64 },

    /// Export aborted at a pipeline stage
    #[error("Export of {app} failed at stage {stage}")]
    #[diagnostic(code(rampack::export_failed))]
    ExportFailed {
        app: String,
        stage: ExportStage,
        #[source]
        source: Box<Error>,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(rampack::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The innermost error, looking through stage wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::ExportFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
