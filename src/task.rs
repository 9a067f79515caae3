// Artifact tasks - cancelable thumbnail and filmstrip pipelines
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::card::{CardState, FrameImage, ThumbnailArtifact, ThumbnailOrigin};
use crate::probe::MediaProbe;

/// Bounding box artifacts are scaled into, aspect ratio preserved.
pub const THUMB_WIDTH: u32 = 320;
pub const THUMB_HEIGHT: u32 = 180;

/// Number of filmstrip frames sampled per video.
pub const FILMSTRIP_FRAMES: usize = 5;

/// Duration assumed when the probe fails or reports a non-positive value.
pub const FALLBACK_DURATION: f64 = 1.0;

/// Lifecycle of one task. Only the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Canceled,
    Failed,
}

/// Everything a task needs, captured by value at spawn time. Workers share
/// nothing with the control thread beyond the card itself.
#[derive(Clone)]
pub struct TaskContext {
    pub card: Arc<CardState>,
    pub probe: Arc<dyn MediaProbe>,
    /// Resolved override image, decided before the task was queued.
    pub override_path: Option<PathBuf>,
    /// Output path for the generated thumbnail.
    pub thumb_out: PathBuf,
    /// Output paths for the filmstrip frames, one per sample.
    pub frame_outs: Vec<PathBuf>,
}

/// Midpoint timestamp used for the representative thumbnail.
pub fn thumbnail_timestamp(duration: f64) -> f64 {
    duration / 2.0
}

/// Evenly spaced sample offsets: `d * i / (N + 1)` for `i` in `1..=N`, so all
/// offsets fall strictly inside the video.
pub fn filmstrip_offsets(duration: f64) -> Vec<f64> {
    (1..=FILMSTRIP_FRAMES)
        .map(|i| duration * i as f64 / (FILMSTRIP_FRAMES + 1) as f64)
        .collect()
}

/// Derive the representative thumbnail for one card.
///
/// Cancellation checkpoints bracket every external call and every publish:
/// once the flag is observed set, nothing further is published.
pub fn run_thumbnail_task(ctx: TaskContext) -> TaskState {
    let card = &ctx.card;
    if card.cancel_flag().is_set() {
        return TaskState::Canceled;
    }
    tracing::debug!("thumbnail task running for {}", card.identity());

    // An override image skips probing and extraction entirely.
    if let Some(override_path) = &ctx.override_path {
        match load_scaled(override_path) {
            Ok(image) => {
                if card.cancel_flag().is_set() {
                    return TaskState::Canceled;
                }
                card.publish_thumbnail(ThumbnailArtifact {
                    image,
                    origin: ThumbnailOrigin::Override,
                });
                return TaskState::Completed;
            }
            Err(e) => {
                tracing::warn!(
                    "override image {} failed to decode ({e}), generating instead",
                    override_path.display()
                );
            }
        }
    }

    let duration = match probe_duration_checked(&ctx) {
        Some(duration) => duration,
        None => return TaskState::Canceled,
    };
    let timestamp = thumbnail_timestamp(duration);

    if card.cancel_flag().is_set() {
        return TaskState::Canceled;
    }
    if let Err(e) = ctx
        .probe
        .extract_frame(&card.entry().source_path, timestamp, &ctx.thumb_out)
    {
        tracing::warn!("thumbnail extraction failed for {}: {e}", card.identity());
        return TaskState::Failed;
    }

    if card.cancel_flag().is_set() {
        return TaskState::Canceled;
    }
    let image = match load_scaled(&ctx.thumb_out) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("thumbnail decode failed for {}: {e}", card.identity());
            return TaskState::Failed;
        }
    };

    if card.cancel_flag().is_set() {
        return TaskState::Canceled;
    }
    card.publish_thumbnail(ThumbnailArtifact {
        image,
        origin: ThumbnailOrigin::Generated,
    });
    TaskState::Completed
}

/// Generate the filmstrip for one card, streaming each frame as it lands.
///
/// A cancel observed mid-loop leaves the frames appended so far intact; the
/// filmstrip is frozen the moment this function returns.
pub fn run_filmstrip_task(ctx: TaskContext) -> TaskState {
    let card = &ctx.card;
    if card.cancel_flag().is_set() {
        return TaskState::Canceled;
    }
    tracing::debug!("filmstrip task running for {}", card.identity());

    let duration = match probe_duration_checked(&ctx) {
        Some(duration) => duration,
        None => return TaskState::Canceled,
    };

    let mut appended = 0usize;
    for (i, offset) in filmstrip_offsets(duration).iter().enumerate() {
        if card.cancel_flag().is_set() {
            return TaskState::Canceled;
        }
        let out = &ctx.frame_outs[i];
        if let Err(e) = ctx
            .probe
            .extract_frame(&card.entry().source_path, *offset, out)
        {
            tracing::warn!(
                "filmstrip frame {} failed for {}: {e}",
                i + 1,
                card.identity()
            );
            continue;
        }

        if card.cancel_flag().is_set() {
            return TaskState::Canceled;
        }
        match load_scaled(out) {
            Ok(frame) => {
                appended = card.publish_frame(frame);
            }
            Err(e) => {
                tracing::warn!(
                    "filmstrip frame {} decode failed for {}: {e}",
                    i + 1,
                    card.identity()
                );
            }
        }
    }

    if appended == 0 {
        tracing::warn!("no filmstrip frames produced for {}", card.identity());
        return TaskState::Failed;
    }
    tracing::debug!("filmstrip complete for {} ({appended} frames)", card.identity());
    TaskState::Completed
}

/// Probe the duration with the fallback policy: failures and non-positive
/// readings become [`FALLBACK_DURATION`]. A measured duration is published as
/// a known duration; the fallback never is. Returns `None` when the card was
/// canceled around the call.
fn probe_duration_checked(ctx: &TaskContext) -> Option<f64> {
    let card = &ctx.card;
    if card.cancel_flag().is_set() {
        return None;
    }
    match ctx.probe.probe_duration(&card.entry().source_path) {
        Ok(duration) if duration > 0.0 => {
            if card.cancel_flag().is_set() {
                return None;
            }
            card.publish_duration(duration);
            Some(duration)
        }
        Ok(duration) => {
            tracing::debug!(
                "non-positive duration {duration} for {}, using fallback",
                card.identity()
            );
            Some(FALLBACK_DURATION)
        }
        Err(e) => {
            tracing::warn!("duration probe failed for {}: {e}", card.identity());
            Some(FALLBACK_DURATION)
        }
    }
}

/// Decode an image from disk and scale it into the thumbnail bounding box.
fn load_scaled(path: &Path) -> Result<FrameImage, image::ImageError> {
    let decoded = image::open(path)?;
    let scaled = decoded.thumbnail(THUMB_WIDTH, THUMB_HEIGHT).to_rgba8();
    let (width, height) = scaled.dimensions();
    Ok(FrameImage {
        width,
        height,
        rgba: scaled.into_raw().into(),
    })
}
