// Copyright (c) Contributors to the Rampack project.
// SPDX-License-Identifier: Apache-2.0

//! Tar, tar.gz and zip helpers used by the exporters and the importer.
//!
//! Everything here is blocking; async callers run it through
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./archive_test.rs"]
mod archive_test;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Archive encodings understood by [`unpack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Detect the encoding from the file extension and leading bytes.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut magic = [0u8; 4];
        let mut file = File::open(path).map_err(|error| archive_err(path, error))?;
        let read = file.read(&mut magic).map_err(|error| archive_err(path, error))?;
        let magic = &magic[..read];

        let is_zip_ext = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip_ext || magic.starts_with(&ZIP_MAGIC) {
            Ok(Self::Zip)
        } else if magic.starts_with(&GZIP_MAGIC) {
            Ok(Self::TarGz)
        } else {
            Ok(Self::Tar)
        }
    }
}

/// Whether `path` starts with the gzip magic bytes.
pub fn is_gzip(path: &Path) -> Result<bool> {
    Ok(ArchiveKind::detect(path)? == ArchiveKind::TarGz)
}

/// Unpack a tar, tar.gz or zip archive into `dest`, creating it if needed.
pub fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let kind = ArchiveKind::detect(archive)?;
    tracing::debug!(archive = %archive.display(), dest = %dest.display(), ?kind, "unpacking");
    std::fs::create_dir_all(dest).map_err(|error| archive_err(dest, error))?;
    match kind {
        ArchiveKind::Tar => {
            let file = File::open(archive).map_err(|error| archive_err(archive, error))?;
            unpack_tar_stream(BufReader::new(file), archive, dest)
        }
        ArchiveKind::TarGz => {
            let file = File::open(archive).map_err(|error| archive_err(archive, error))?;
            unpack_tar_stream(GzDecoder::new(BufReader::new(file)), archive, dest)
        }
        ArchiveKind::Zip => unzip(archive, dest),
    }
}

fn unpack_tar_stream<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);
    tar.unpack(dest).map_err(|error| archive_err(archive, error))
}

fn unzip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|error| archive_err(archive, error))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| archive_err(archive, std::io::Error::other(e.to_string())))?;
    zip.extract(dest)
        .map_err(|e| archive_err(archive, std::io::Error::other(e.to_string())))
}

/// Archive `src_dir` into a gzip-compressed tarball at `dest`.
///
/// Entries are rooted at the directory's own name, so unpacking the result
/// recreates `src_dir` as a single top-level directory.
pub fn package_dir(src_dir: &Path, dest: &Path) -> Result<()> {
    let package = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dest.display().to_string());
    let packaging_err = |reason: String| Error::Packaging {
        package: package.clone(),
        reason,
    };
    let root = src_dir
        .file_name()
        .ok_or_else(|| packaging_err(format!("{} has no directory name", src_dir.display())))?;

    let file = File::create(dest).map_err(|e| packaging_err(e.to_string()))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(root, src_dir)
        .map_err(|e| packaging_err(e.to_string()))?;
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .and_then(|mut writer| writer.flush())
        .map_err(|e| packaging_err(e.to_string()))?;
    tracing::debug!(src = %src_dir.display(), package = %dest.display(), "packaged directory");
    Ok(())
}

/// Collect `.tar` files directly under `root` and under its immediate
/// subdirectories, sorted by path within each level.
pub fn find_tar_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut top = Vec::new();
    let mut nested = Vec::new();
    for entry in read_dir_sorted(root)? {
        if entry.is_dir() {
            for inner in read_dir_sorted(&entry)? {
                if is_tar_file(&inner) {
                    nested.push(inner);
                }
            }
        } else if is_tar_file(&entry) {
            top.push(entry);
        }
    }
    top.extend(nested);
    Ok(top)
}

fn is_tar_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "tar")
}

/// Entries of a directory sorted by name.
pub fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|error| Error::ReadFailed {
            path: dir.to_path_buf(),
            error,
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|error| Error::ReadFailed {
            path: dir.to_path_buf(),
            error,
        })?;
    entries.sort();
    Ok(entries)
}

fn archive_err(path: &Path, error: std::io::Error) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        error,
    }
}
