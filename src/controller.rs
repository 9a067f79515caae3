// Catalog controller - the command/event surface a UI shell drives
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::Receiver;

use crate::cache::ArtifactCache;
use crate::card::{CardEvent, CardState, VideoIdentity};
use crate::grid::{self, GridLayout, GridMetrics, SortMode};
use crate::hover::HoverAnimator;
use crate::pool::WorkerPool;
use crate::probe::{CommandProbe, MediaProbe};
use crate::scanner;
use crate::store::{OverrideStore, PinStore};
use crate::task::{self, TaskContext, FILMSTRIP_FRAMES};

/// Controller construction options.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Directory searched for `<title>.<ext>` override images.
    pub override_dir: Option<PathBuf>,
    /// Shuffle the card order once per reload.
    pub shuffle_on_reload: bool,
    /// Worker pool size; defaults to a small multiple of the core count.
    pub worker_threads: Option<usize>,
}

/// Owns the card arena and the artifact pipeline behind it. A presentation
/// shell issues the commands below from its control thread and drains
/// [`poll_events`](Self::poll_events) once per frame.
///
/// Cards are only ever referenced by identity across this boundary; nothing
/// outside the arena holds a pointer into it.
pub struct CatalogController {
    config: CatalogConfig,
    probe: Arc<dyn MediaProbe>,
    pins: Box<dyn PinStore>,
    overrides: Box<dyn OverrideStore>,
    cache: ArtifactCache,
    pool: WorkerPool,
    cards: Vec<Arc<CardState>>,
    receivers: HashMap<VideoIdentity, Receiver<CardEvent>>,
    animators: HashMap<VideoIdentity, HoverAnimator>,
    filter: String,
}

impl CatalogController {
    pub fn new(
        config: CatalogConfig,
        probe: Arc<dyn MediaProbe>,
        pins: Box<dyn PinStore>,
        overrides: Box<dyn OverrideStore>,
    ) -> Result<Self> {
        let cache = ArtifactCache::new(config.override_dir.clone())?;
        let pool = WorkerPool::new(config.worker_threads)?;
        Ok(Self {
            config,
            probe,
            pins,
            overrides,
            cache,
            pool,
            cards: Vec::new(),
            receivers: HashMap::new(),
            animators: HashMap::new(),
            filter: String::new(),
        })
    }

    /// Controller wired to the real ffprobe/ffmpeg commands.
    pub fn with_command_probe(
        config: CatalogConfig,
        pins: Box<dyn PinStore>,
        overrides: Box<dyn OverrideStore>,
    ) -> Result<Self> {
        Self::new(config, Arc::new(CommandProbe), pins, overrides)
    }

    // --- commands ---

    /// Rebuild the catalog from `root`.
    ///
    /// The previous generation is canceled and fully drained - including any
    /// external process a task already spawned - before its cards are
    /// dropped, so old and new generations never race on the shared artifact
    /// directory. Calling this while an earlier reload is still settling is
    /// therefore safe.
    pub fn reload(&mut self, root: &Path) -> Result<()> {
        self.drain();
        self.cards.clear();
        self.receivers.clear();
        self.animators.clear();

        let mut entries = scanner::scan_directory(root)?;
        if self.config.shuffle_on_reload {
            scanner::shuffle_entries(&mut entries);
        }

        for entry in entries {
            let pinned = self.pins.contains(&entry.identity);
            let (card, events_rx) = CardState::new(entry, pinned);
            self.receivers.insert(card.identity().clone(), events_rx);
            self.spawn_thumbnail(&card);
            self.spawn_filmstrip(&card);
            self.cards.push(card);
        }

        tracing::info!("catalog reloaded with {} cards", self.cards.len());
        Ok(())
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Reorder the card sequence. Random ordering happens here, once per
    /// command - layout itself never reshuffles.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        grid::apply_sort(&mut self.cards, mode);
    }

    /// Toggle a card's pin and persist the change. Returns the new state, or
    /// `None` for an unknown identity.
    pub fn toggle_pinned(&mut self, identity: &VideoIdentity) -> Option<bool> {
        let card = self.cards.iter().find(|c| c.identity() == identity)?;
        let pinned = !card.pinned();
        card.set_pinned(pinned);
        if pinned {
            self.pins.add(identity);
        } else {
            self.pins.remove(identity);
        }
        Some(pinned)
    }

    /// Record a thumbnail override for a video. The thumbnail is re-derived
    /// right away when the card's previous thumbnail task has already
    /// terminated; otherwise the override applies from the next reload, so a
    /// card never runs two thumbnail tasks at once.
    pub fn set_override(&mut self, identity: &VideoIdentity, path: PathBuf) {
        self.overrides.set(identity, path);

        let Some(card) = self.cards.iter().find(|c| c.identity() == identity) else {
            return;
        };
        if !card.thumbnail_task_finished() {
            tracing::debug!("thumbnail task for {identity} still in flight, override applies on next reload");
            return;
        }
        let card = Arc::clone(card);
        self.spawn_thumbnail(&card);
    }

    /// Pointer entered a card. Starts cycling its filmstrip if any frames
    /// have arrived yet.
    pub fn hover_enter(&mut self, identity: &VideoIdentity, now: Instant) {
        let Some(card) = self.cards.iter().find(|c| c.identity() == identity) else {
            return;
        };
        let filmstrip_len = card.filmstrip_len();
        self.animators
            .entry(identity.clone())
            .or_default()
            .hover_enter(filmstrip_len, now);
    }

    /// Pointer left a card; its animation stops immediately.
    pub fn hover_leave(&mut self, identity: &VideoIdentity) {
        if let Some(animator) = self.animators.get_mut(identity) {
            animator.hover_leave();
        }
    }

    // --- observation ---

    /// Advance hover animations. Returns the filmstrip frame index each
    /// animating card should display now.
    pub fn tick_hover(&mut self, now: Instant) -> Vec<(VideoIdentity, usize)> {
        let mut updates = Vec::new();
        for (identity, animator) in &mut self.animators {
            let Some(card) = self.cards.iter().find(|c| c.identity() == identity) else {
                continue;
            };
            if let Some(frame) = animator.tick(card.filmstrip_len(), now) {
                updates.push((identity.clone(), frame));
            }
        }
        updates
    }

    /// Drain pending events from every card's channel. Events for different
    /// cards arrive in no particular relative order.
    pub fn poll_events(&mut self) -> Vec<(VideoIdentity, CardEvent)> {
        let mut out = Vec::new();
        for card in &self.cards {
            if let Some(events_rx) = self.receivers.get(card.identity()) {
                while let Ok(event) = events_rx.try_recv() {
                    out.push((card.identity().clone(), event));
                }
            }
        }
        out
    }

    /// Lay out the current cards with the active filter.
    pub fn layout(&self, columns: usize, metrics: GridMetrics) -> GridLayout {
        grid::layout(&self.cards, &self.filter, columns, metrics)
    }

    pub fn cards(&self) -> &[Arc<CardState>] {
        &self.cards
    }

    pub fn card(&self, identity: &VideoIdentity) -> Option<&Arc<CardState>> {
        self.cards.iter().find(|c| c.identity() == identity)
    }

    // --- internals ---

    fn spawn_thumbnail(&self, card: &Arc<CardState>) {
        let ctx = self.task_context(card);
        let handle = self.pool.spawn(move || task::run_thumbnail_task(ctx));
        card.set_thumbnail_handle(handle);
    }

    fn spawn_filmstrip(&self, card: &Arc<CardState>) {
        let ctx = self.task_context(card);
        let handle = self.pool.spawn(move || task::run_filmstrip_task(ctx));
        card.set_filmstrip_handle(handle);
    }

    /// Capture everything a task needs by value, including the override
    /// resolution, so workers never call back into the stores.
    fn task_context(&self, card: &Arc<CardState>) -> TaskContext {
        let identity = card.identity();
        let stored = self.overrides.get(identity);
        let override_path = self
            .cache
            .resolve_override(stored.as_deref(), &card.entry().title);
        TaskContext {
            card: Arc::clone(card),
            probe: Arc::clone(&self.probe),
            override_path,
            thumb_out: self.cache.thumbnail_path(identity),
            frame_outs: (1..=FILMSTRIP_FRAMES)
                .map(|i| self.cache.frame_path(identity, i))
                .collect(),
        }
    }

    /// Cancel every in-flight task and block until all of them have fully
    /// terminated. Only after this may cards be dropped or the shared
    /// artifact directory be reused.
    fn drain(&mut self) {
        for card in &self.cards {
            card.cancel_flag().set();
        }
        for card in &self.cards {
            for handle in card.take_handles() {
                let state = handle.join();
                tracing::debug!("task for {} drained as {state:?}", card.identity());
            }
        }
    }
}

impl Drop for CatalogController {
    /// Shutdown follows the same drain discipline as reload: no task or
    /// external process outlives the controller.
    fn drop(&mut self) {
        self.drain();
    }
}
