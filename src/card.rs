// Card state - per-video record, identity, artifacts and event channel
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::pool::TaskHandle;

/// Canonicalized absolute path string; the stable key for pin state and
/// thumbnail overrides across reloads of the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoIdentity(String);

impl VideoIdentity {
    /// Derive the identity for a file: the canonical path where resolvable,
    /// the absolute path otherwise.
    pub fn for_path(path: &Path) -> Self {
        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| absolute(path));
        Self(resolved.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// One discovered video. Immutable once created.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub identity: VideoIdentity,
    /// File base name without extension.
    pub title: String,
    /// Name of the immediate parent directory.
    pub channel: String,
    pub source_path: PathBuf,
}

/// A decoded frame scaled into the thumbnail bounding box. Pixel data sits
/// behind an `Arc` so events can carry frames without copying them.
#[derive(Clone)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

impl fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOrigin {
    /// User-supplied image resolved through the override policy.
    Override,
    /// Frame extracted from the video itself.
    Generated,
}

#[derive(Debug, Clone)]
pub struct ThumbnailArtifact {
    pub image: FrameImage,
    pub origin: ThumbnailOrigin,
}

/// Events published on a card's channel as its pipeline makes progress.
#[derive(Debug, Clone)]
pub enum CardEvent {
    ThumbnailReady(ThumbnailArtifact),
    FrameAppended { frame: FrameImage, new_len: usize },
    DurationKnown(f64),
}

/// Cooperative cancellation flag shared by a card's tasks. Tasks observe it
/// at defined checkpoints; nothing is interrupted preemptively.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable per-video record. The card owns its artifacts; worker tasks write
/// them through the publish methods and the presentation layer only observes
/// via the event channel and the snapshot accessors.
pub struct CardState {
    entry: CatalogEntry,
    pinned: AtomicBool,
    duration: Mutex<Option<f64>>,
    thumbnail: Mutex<Option<ThumbnailArtifact>>,
    filmstrip: Mutex<Vec<FrameImage>>,
    cancel: CancelFlag,
    thumbnail_task: Mutex<Option<TaskHandle>>,
    filmstrip_task: Mutex<Option<TaskHandle>>,
    events_tx: Sender<CardEvent>,
}

impl CardState {
    /// Build the card for an entry. Returns the shared state together with
    /// the receiving half of its event channel.
    pub fn new(entry: CatalogEntry, pinned: bool) -> (Arc<Self>, Receiver<CardEvent>) {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let card = Arc::new(Self {
            entry,
            pinned: AtomicBool::new(pinned),
            duration: Mutex::new(None),
            thumbnail: Mutex::new(None),
            filmstrip: Mutex::new(Vec::new()),
            cancel: CancelFlag::default(),
            thumbnail_task: Mutex::new(None),
            filmstrip_task: Mutex::new(None),
            events_tx,
        });
        (card, events_rx)
    }

    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }

    pub fn identity(&self) -> &VideoIdentity {
        &self.entry.identity
    }

    pub fn pinned(&self) -> bool {
        self.pinned.load(Ordering::SeqCst)
    }

    pub fn set_pinned(&self, pinned: bool) {
        self.pinned.store(pinned, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Probed duration in seconds, once known.
    pub fn duration(&self) -> Option<f64> {
        *self.duration.lock().unwrap()
    }

    pub fn thumbnail(&self) -> Option<ThumbnailArtifact> {
        self.thumbnail.lock().unwrap().clone()
    }

    pub fn filmstrip_len(&self) -> usize {
        self.filmstrip.lock().unwrap().len()
    }

    pub fn filmstrip_frame(&self, index: usize) -> Option<FrameImage> {
        self.filmstrip.lock().unwrap().get(index).cloned()
    }

    // --- task-side publishers ---
    // Each send is preceded by a cancellation checkpoint in the task body;
    // a disconnected receiver just means the presentation side moved on.

    pub(crate) fn publish_duration(&self, seconds: f64) {
        *self.duration.lock().unwrap() = Some(seconds);
        let _ = self.events_tx.send(CardEvent::DurationKnown(seconds));
    }

    pub(crate) fn publish_thumbnail(&self, artifact: ThumbnailArtifact) {
        *self.thumbnail.lock().unwrap() = Some(artifact.clone());
        let _ = self.events_tx.send(CardEvent::ThumbnailReady(artifact));
    }

    /// Append a filmstrip frame and report the new length. Frames are never
    /// removed or reordered; a partial filmstrip stays as-is after a cancel.
    pub(crate) fn publish_frame(&self, frame: FrameImage) -> usize {
        let mut filmstrip = self.filmstrip.lock().unwrap();
        filmstrip.push(frame.clone());
        let new_len = filmstrip.len();
        drop(filmstrip);
        let _ = self
            .events_tx
            .send(CardEvent::FrameAppended { frame, new_len });
        new_len
    }

    // --- task handle bookkeeping ---

    pub(crate) fn set_thumbnail_handle(&self, handle: TaskHandle) {
        *self.thumbnail_task.lock().unwrap() = Some(handle);
    }

    pub(crate) fn set_filmstrip_handle(&self, handle: TaskHandle) {
        *self.filmstrip_task.lock().unwrap() = Some(handle);
    }

    /// True when no thumbnail task is in flight for this card.
    pub fn thumbnail_task_finished(&self) -> bool {
        match self.thumbnail_task.lock().unwrap().as_ref() {
            Some(handle) => handle.try_finished().is_some(),
            None => true,
        }
    }

    /// Detach both task handles so the caller can block on them. The card is
    /// only dropped after every handle has been joined.
    pub(crate) fn take_handles(&self) -> Vec<TaskHandle> {
        let mut handles = Vec::new();
        if let Some(handle) = self.thumbnail_task.lock().unwrap().take() {
            handles.push(handle);
        }
        if let Some(handle) = self.filmstrip_task.lock().unwrap().take() {
            handles.push(handle);
        }
        handles
    }
}

impl fmt::Debug for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardState")
            .field("identity", &self.entry.identity)
            .field("pinned", &self.pinned())
            .field("filmstrip_len", &self.filmstrip_len())
            .finish()
    }
}
