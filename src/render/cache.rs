//! Rendered artifacts keyed by diagram fingerprint

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::parser::{DiagramKind, ParseResult};

/// Cache key: diagram type plus a hash of the exact content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub kind: DiagramKind,
    pub content_hash: u64,
}

impl Fingerprint {
    #[must_use]
    pub fn of(kind: DiagramKind, content: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Self {
            kind,
            content_hash: hasher.finish(),
        }
    }

    /// Fingerprints of every diagram in a result
    #[must_use]
    pub fn present_in(result: &ParseResult) -> HashSet<Self> {
        result
            .diagrams
            .iter()
            .map(|d| Self::of(d.kind, &d.content))
            .collect()
    }
}

/// A cached render outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedRender {
    Rendered(Arc<[u8]>),
    Failed(String),
}

impl CachedRender {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Fingerprint → render outcome map
///
/// Grows without bound; failures are dropped once their content disappears
/// from the document, everything else on `evict_absent` or `clear`.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<Fingerprint, CachedRender>,
}

impl RenderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: DiagramKind, content: &str) -> Option<&CachedRender> {
        self.entries.get(&Fingerprint::of(kind, content))
    }

    pub fn put(&mut self, kind: DiagramKind, content: &str, entry: CachedRender) {
        self.insert(Fingerprint::of(kind, content), entry);
    }

    #[must_use]
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&CachedRender> {
        self.entries.get(fingerprint)
    }

    /// Store an entry; the last write for a fingerprint wins
    pub fn insert(&mut self, fingerprint: Fingerprint, entry: CachedRender) {
        self.entries.insert(fingerprint, entry);
    }

    /// Drop cached failures whose content is no longer in the document
    pub fn invalidate_failures(&mut self, present: &HashSet<Fingerprint>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|fingerprint, entry| !entry.is_failure() || present.contains(fingerprint));
        before - self.entries.len()
    }

    /// Drop every entry whose content is no longer in the document
    pub fn evict_absent(&mut self, present: &HashSet<Fingerprint>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|fingerprint, _| present.contains(fingerprint));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render cache shared between the session and render workers
#[derive(Debug, Clone, Default)]
pub struct SharedRenderCache(Arc<Mutex<RenderCache>>);

impl SharedRenderCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cache; a panicked writer leaves a usable map behind
    pub fn lock(&self) -> MutexGuard<'_, RenderCache> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, kind: DiagramKind, content: &str) -> Option<CachedRender> {
        self.lock().get(kind, content).cloned()
    }

    pub fn put(&self, kind: DiagramKind, content: &str, entry: CachedRender) {
        self.lock().put(kind, content, entry);
    }
}
