// Artifact cache - override resolution and ephemeral output paths
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use tempfile::TempDir;

use crate::card::VideoIdentity;

/// Extensions tried when looking for `<title>.<ext>` under the override
/// directory, in priority order.
pub const OVERRIDE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Resolves user-supplied override images and hands out deterministic output
/// paths inside a process-lifetime temp directory. The directory is removed
/// when the cache is dropped; generated artifacts are never durable.
pub struct ArtifactCache {
    temp_dir: TempDir,
    override_dir: Option<PathBuf>,
}

impl ArtifactCache {
    pub fn new(override_dir: Option<PathBuf>) -> Result<Self> {
        let temp_dir = TempDir::new().context("failed to create artifact directory")?;
        tracing::debug!("artifact directory at {}", temp_dir.path().display());
        Ok(Self {
            temp_dir,
            override_dir,
        })
    }

    pub fn artifact_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve the override image for a video, if any: the stored per-identity
    /// path wins, then `<title>.<ext>` under the override directory. `None`
    /// means the thumbnail must be generated.
    pub fn resolve_override(&self, stored: Option<&Path>, title: &str) -> Option<PathBuf> {
        if let Some(path) = stored {
            if is_readable_file(path) {
                return Some(path.to_path_buf());
            }
            tracing::warn!(
                "stored thumbnail override {} is unreadable, falling back",
                path.display()
            );
        }

        let base = self.override_dir.as_ref()?;
        OVERRIDE_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("{title}.{ext}")))
            .find(|candidate| is_readable_file(candidate))
    }

    /// Output path for a generated thumbnail. Deterministic per identity, so
    /// a retry overwrites its own earlier output and nothing else.
    pub fn thumbnail_path(&self, identity: &VideoIdentity) -> PathBuf {
        self.temp_dir
            .path()
            .join(format!("{}_thumb.png", identity_hash(identity)))
    }

    /// Output path for filmstrip frame `index` (1-based, matching the sample
    /// offsets).
    pub fn frame_path(&self, identity: &VideoIdentity, index: usize) -> PathBuf {
        self.temp_dir
            .path()
            .join(format!("{}_strip_{index}.png", identity_hash(identity)))
    }
}

/// First 16 hex chars of the identity digest; filesystem-safe and distinct
/// per video.
fn identity_hash(identity: &VideoIdentity) -> String {
    let mut hasher = Md5::new();
    hasher.update(identity.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}
