//! Batch input discovery.
//!
//! A file path yields itself when its extension is accepted; a directory is
//! walked recursively. Hidden entries (dot-files and dot-directories, such
//! as `.DS_Store` or `._photo.jpg` resource forks) are never picked up.
//! Results are sorted by path so batches are reproducible. Callers can
//! exclude directories, such as an output folder inside the input tree.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::BatchConfig;

/// A candidate batch input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Size on disk in bytes
    pub size: u64,
}

/// Finds batch inputs by extension.
pub struct FileDiscovery {
    extensions: Vec<String>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_excluded(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    !excluded.is_empty()
        && entry.depth() > 0
        && entry.file_type().is_dir()
        && std::fs::canonicalize(entry.path()).is_ok_and(|p| excluded.contains(&p))
}

impl FileDiscovery {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            extensions: config
                .supported_formats
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Collect accepted files at `path`, sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        self.discover_excluding(path, &[])
    }

    /// Like [`discover`](Self::discover), skipping the `excluded` directories.
    ///
    /// Directories that do not exist yet are ignored.
    pub fn discover_excluding(&self, path: &Path, excluded: &[PathBuf]) -> Vec<DiscoveredFile> {
        let excluded: Vec<PathBuf> = excluded
            .iter()
            .filter_map(|dir| std::fs::canonicalize(dir).ok())
            .collect();
        if path.is_file() {
            return std::fs::metadata(path)
                .ok()
                .filter(|_| self.accepts(path))
                .map(|meta| DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                })
                .into_iter()
                .collect();
        }

        let mut rejected = 0usize;
        let mut files = Vec::new();
        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_hidden(e) && !is_excluded(e, &excluded))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !self.accepts(entry.path()) {
                rejected += 1;
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                files.push(DiscoveredFile {
                    path: entry.into_path(),
                    size: meta.len(),
                });
            }
        }

        if rejected > 0 {
            tracing::debug!("Ignored {rejected} file(s) with unsupported extensions under {:?}", path);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        !hidden && self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
    }

    /// Combined size of `files` in bytes.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
