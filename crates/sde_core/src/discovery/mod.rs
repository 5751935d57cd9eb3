//! Candidate file discovery.
//!
//! Scans a root directory for video files eligible for enhancement.
//! The walk is recursive but never descends into the output subfolder,
//! so already-enhanced files are not picked up again. Results are sorted
//! by path, making repeated scans of an unchanged tree identical.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::models::SourceFile;

/// Extensions eligible for processing, lowercase without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mkv", "mp4", "mov"];

/// Errors from scanning the root directory.
///
/// Per-file oddities (broken symlinks, unreadable entries) are skipped,
/// not errors; only an unusable root aborts the scan.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The root directory does not exist.
    #[error("root directory not found: {0}")]
    RootNotFound(PathBuf),

    /// The root path exists but is not a directory.
    #[error("root path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root directory could not be read.
    #[error("failed to read root directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scan a root directory for eligible video files.
///
/// Returns files in sorted path order. An empty result is not an error.
/// Directories named exactly `output_subfolder` are not entered at any
/// depth.
pub fn scan(root: &Path, output_subfolder: &str) -> Result<Vec<SourceFile>, DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    // Canonicalize so listed paths are absolute regardless of how the
    // root was supplied.
    let root = root
        .canonicalize()
        .map_err(|source| DiscoveryError::Unreadable {
            path: root.to_path_buf(),
            source,
        })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() && entry.depth() > 0 {
                !is_named(entry.path(), output_subfolder)
            } else {
                true
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                // Root-level read failures are fatal; deeper ones are not.
                if err.depth() == 0 {
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walk error"));
                    return Err(DiscoveryError::Unreadable { path: root, source });
                }
                tracing::debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if has_supported_extension(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();

    tracing::info!("discovered {} video file(s) under {}", paths.len(), root.display());

    Ok(paths.into_iter().map(SourceFile::new).collect())
}

/// Case-insensitive check against the extension allow-list.
fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Whether the final path component matches `name` (non-empty).
fn is_named(path: &Path, name: &str) -> bool {
    !name.is_empty()
        && path
            .file_name()
            .map(|n| n.to_string_lossy() == name)
            .unwrap_or(false)
}
