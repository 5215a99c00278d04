//! ZIP extraction confined to a destination directory, and location of the
//! primary geometry (`.shp`) file.
//!
//! Everything here is blocking I/O; async callers go through
//! `tokio::task::spawn_blocking`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use sigap_core::defaults::PRIMARY_GEOMETRY_EXTENSION;
use sigap_core::{Error, Result};

/// Unix file-type bits for a symbolic link.
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Extract `archive` into `dest` and return the primary geometry file.
pub fn unpack_archive(archive: &Path, dest: &Path, max_extracted_bytes: u64) -> Result<PathBuf> {
    let written = extract_archive(archive, dest, max_extracted_bytes)?;
    debug!(
        subsystem = "ingest",
        component = "archive",
        op = "extract",
        archive = %archive.display(),
        bytes = written,
        "Archive extracted"
    );
    locate_primary_geometry(dest)
}

/// Extract every entry of a ZIP archive under `dest`.
///
/// `dest` is created if missing and must otherwise be empty. Entries that are
/// absolute or contain `..` reject the whole archive; symlink entries are
/// skipped. Returns the number of bytes written.
pub fn extract_archive(archive: &Path, dest: &Path, max_extracted_bytes: u64) -> Result<u64> {
    ensure_fresh_destination(dest)?;

    let file = File::open(archive)
        .map_err(|e| Error::ArchiveCorrupt(format!("cannot open archive: {}", e)))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .map_err(|e| Error::ArchiveCorrupt(format!("not a readable ZIP archive: {}", e)))?;

    let mut remaining = max_extracted_bytes;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| Error::ArchiveCorrupt(format!("unreadable entry #{}: {}", index, e)))?;

        // Check the raw name as well as zip's own enclosed_name(): "a/../"
        // stays inside the destination but is still refused.
        let relative = PathBuf::from(entry.name());
        if !is_confined(&relative) || entry.enclosed_name().is_none() {
            return Err(Error::ArchiveCorrupt(format!(
                "entry {:?} escapes the extraction directory",
                entry.name()
            )));
        }
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(extraction_error)?;
            continue;
        }
        if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            warn!(
                subsystem = "ingest",
                component = "archive",
                entry = entry.name(),
                "Skipping symlink entry"
            );
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(extraction_error)?;
        }
        let mut out = File::create(&target).map_err(extraction_error)?;
        // Read one byte past the budget to detect overflow without trusting
        // the sizes declared in the archive.
        let written = io::copy(&mut entry.by_ref().take(remaining.saturating_add(1)), &mut out)
            .map_err(extraction_error)?;
        if written > remaining {
            return Err(Error::ArchiveCorrupt(format!(
                "archive expands beyond {} bytes",
                max_extracted_bytes
            )));
        }
        remaining -= written;
    }

    Ok(max_extracted_bytes - remaining)
}

/// Find the primary geometry file at the top level of `dir`.
///
/// The extension match is case-insensitive. If several match, the
/// lexicographically first file name wins.
pub fn locate_primary_geometry(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PRIMARY_GEOMETRY_EXTENSION))
        })
        .collect();
    candidates.sort();

    if candidates.len() > 1 {
        debug!(
            subsystem = "ingest",
            component = "archive",
            count = candidates.len(),
            "Multiple geometry files found, using the first"
        );
    }

    candidates.into_iter().next().ok_or_else(|| {
        Error::ArchiveInvalid(format!(
            "{} file not found inside ZIP",
            PRIMARY_GEOMETRY_EXTENSION.to_uppercase()
        ))
    })
}

fn ensure_fresh_destination(dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    if fs::read_dir(dest)?.next().is_some() {
        return Err(Error::Internal(format!(
            "extraction directory {} is not empty",
            dest.display()
        )));
    }
    Ok(())
}

fn is_confined(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn extraction_error(e: io::Error) -> Error {
    Error::ArchiveCorrupt(format!("extraction failed: {}", e))
}
