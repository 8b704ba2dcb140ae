use std::fmt;

use scene::SceneGraph;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub provider: String,
    pub resource_id: String,
}

impl CacheKey {
    pub fn new(provider: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.resource_id)
    }
}

/// Holds the last successfully loaded scene.
///
/// A single slot: storing a new scene replaces the old one. Every remount
/// takes a deep copy, so the cached graph is never mounted itself.
#[derive(Debug, Default)]
pub struct SceneCache {
    slot: Option<(CacheKey, SceneGraph)>,
    hits: u64,
    misses: u64,
}

impl SceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, key: CacheKey, graph: SceneGraph) {
        tracing::debug!(%key, nodes = graph.node_count(), "caching scene");
        self.slot = Some((key, graph));
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slot.as_ref().is_some_and(|(k, _)| k == key)
    }

    pub fn get(&self, key: &CacheKey) -> Option<&SceneGraph> {
        self.slot.as_ref().filter(|(k, _)| k == key).map(|(_, g)| g)
    }

    /// Independent deep copy of the cached scene for `key`.
    pub fn clone_for_remount(&mut self, key: &CacheKey) -> Option<SceneGraph> {
        let copy = self.get(key).map(SceneGraph::clone_for_remount);
        if copy.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        copy
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.slot.as_ref().map(|(k, _)| k)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
