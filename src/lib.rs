//! Core engine of a directory-backed video catalog browser.
//!
//! Scans a root directory for video files, derives a representative
//! thumbnail and a hover filmstrip for every card by shelling out to
//! ffprobe/ffmpeg on a bounded worker pool, and exposes the pure
//! layout/filter/sort logic that turns the card set into a grid. Window
//! chrome, playback and persistence belong to the embedding application;
//! it drives this crate through [`CatalogController`]'s commands, per-card
//! event channels and the [`store`] key-value traits.

pub mod cache;
pub mod card;
pub mod controller;
pub mod format;
pub mod grid;
pub mod hover;
pub mod pool;
pub mod probe;
pub mod scanner;
pub mod store;
pub mod task;

pub use card::{
    CardEvent, CardState, CatalogEntry, FrameImage, ThumbnailArtifact, ThumbnailOrigin,
    VideoIdentity,
};
pub use controller::{CatalogConfig, CatalogController};
pub use grid::{GridLayout, GridMetrics, SortMode};
pub use hover::{HoverAnimator, HoverState};
pub use probe::{CommandError, CommandProbe, MediaProbe};
pub use task::TaskState;
