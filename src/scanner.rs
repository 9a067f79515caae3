// Catalog scanner - recursive discovery of video files under a root
use std::path::Path;

use anyhow::Result;
use rand::seq::SliceRandom;
use walkdir::WalkDir;

use crate::card::{CatalogEntry, VideoIdentity};

/// Recognized video extensions (matched case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov"];

/// Recursively scan `root` for video files.
///
/// Unreadable entries are skipped with a log line and the scan keeps going;
/// only an unusable root is an error.
pub fn scan_directory(root: &Path) -> Result<Vec<CatalogEntry>> {
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }

    let mut entries = Vec::new();
    for result in WalkDir::new(root).follow_links(false) {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_video_extension(entry.path()) {
            continue;
        }
        entries.push(catalog_entry(entry.path()));
    }

    tracing::info!("found {} videos under {}", entries.len(), root.display());
    Ok(entries)
}

/// One-time shuffle applied after a scan. Layout never reorders on its own;
/// this is the only place the card order is randomized per reload.
pub fn shuffle_entries(entries: &mut [CatalogEntry]) {
    entries.shuffle(&mut rand::thread_rng());
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Title comes from the file stem, channel from the immediate parent
/// directory name.
fn catalog_entry(path: &Path) -> CatalogEntry {
    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let channel = path
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    CatalogEntry {
        identity: VideoIdentity::for_path(path),
        title,
        channel,
        source_path: path.to_path_buf(),
    }
}
