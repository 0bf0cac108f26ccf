//! ZIP packaging of finished batches.
//!
//! Layout:
//!
//! ```text
//! converted/<output name>
//! originals/<source name>     (optional)
//! ```
//!
//! Names that repeat inside a folder get a ` (2)`, ` (3)`, ... suffix
//! before the extension.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::job::{BatchJob, ItemStatus};
use crate::error::{ProcessError, ProcessResult};

pub const CONVERTED_DIR: &str = "converted";
pub const ORIGINALS_DIR: &str = "originals";

/// What went into an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveManifest {
    /// Entry paths in write order
    pub entries: Vec<String>,
}

fn archive_error(e: impl std::fmt::Display) -> ProcessError {
    ProcessError::Archive(e.to_string())
}

/// Pick a name not yet in `taken`, recording it.
pub fn unique_name(taken: &mut HashSet<String>, name: &str) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Write the successful outputs of `job` (and optionally their originals).
///
/// Failed and pending items are skipped.
pub fn write_archive<W: Write + Seek>(
    writer: W,
    job: &BatchJob,
    include_originals: bool,
) -> ProcessResult<ArchiveManifest> {
    let mut zip = ZipWriter::new(writer);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut manifest = ArchiveManifest::default();
    let mut converted_names = HashSet::new();
    let mut original_names = HashSet::new();

    for item in job.items().iter().filter(|i| i.status() == ItemStatus::Done) {
        let Some(output) = item.output() else { continue };

        let entry = format!(
            "{CONVERTED_DIR}/{}",
            unique_name(&mut converted_names, &output.output_name)
        );
        zip.start_file(entry.as_str(), deflated).map_err(archive_error)?;
        zip.write_all(&output.encoded.bytes).map_err(archive_error)?;
        manifest.entries.push(entry);

        if include_originals {
            let entry = format!(
                "{ORIGINALS_DIR}/{}",
                unique_name(&mut original_names, &item.name())
            );
            item.source.with_bytes(|bytes| {
                zip.start_file(entry.as_str(), deflated).map_err(archive_error)?;
                zip.write_all(bytes).map_err(archive_error)
            })?;
            manifest.entries.push(entry);
        }
    }

    zip.finish().map_err(archive_error)?;
    tracing::debug!("Archived {} entries", manifest.entries.len());
    Ok(manifest)
}

/// Build the archive in memory.
pub fn archive_to_vec(job: &BatchJob, include_originals: bool) -> ProcessResult<(Vec<u8>, ArchiveManifest)> {
    let mut cursor = Cursor::new(Vec::new());
    let manifest = write_archive(&mut cursor, job, include_originals)?;
    Ok((cursor.into_inner(), manifest))
}

/// Write the archive to `path`.
pub fn write_archive_file(path: &Path, job: &BatchJob, include_originals: bool) -> ProcessResult<ArchiveManifest> {
    let file = File::create(path).map_err(|source| ProcessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_archive(file, job, include_originals)
}
