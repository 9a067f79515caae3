// Persisted pin/override state - key-value seams owned by the embedding app
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::card::VideoIdentity;

/// Pinned-identity set. The embedding application decides how it persists;
/// the core only issues keyed calls.
pub trait PinStore: Send {
    fn contains(&self, identity: &VideoIdentity) -> bool;
    fn add(&mut self, identity: &VideoIdentity);
    fn remove(&mut self, identity: &VideoIdentity);
}

/// Per-identity thumbnail override paths, same ownership split as [`PinStore`].
pub trait OverrideStore: Send {
    fn get(&self, identity: &VideoIdentity) -> Option<PathBuf>;
    fn set(&mut self, identity: &VideoIdentity, path: PathBuf);
}

/// In-memory pin set for tests and sessions without persistence.
#[derive(Debug, Default)]
pub struct MemoryPins(HashSet<VideoIdentity>);

impl PinStore for MemoryPins {
    fn contains(&self, identity: &VideoIdentity) -> bool {
        self.0.contains(identity)
    }

    fn add(&mut self, identity: &VideoIdentity) {
        self.0.insert(identity.clone());
    }

    fn remove(&mut self, identity: &VideoIdentity) {
        self.0.remove(identity);
    }
}

/// In-memory override map, counterpart of [`MemoryPins`].
#[derive(Debug, Default)]
pub struct MemoryOverrides(HashMap<VideoIdentity, PathBuf>);

impl OverrideStore for MemoryOverrides {
    fn get(&self, identity: &VideoIdentity) -> Option<PathBuf> {
        self.0.get(identity).cloned()
    }

    fn set(&mut self, identity: &VideoIdentity, path: PathBuf) {
        self.0.insert(identity.clone(), path);
    }
}
