use std::sync::Arc;

use dashmap::DashMap;
use gloss_types::CacheEntry;
use tokio::sync::OnceCell;

pub(crate) type Slot = Arc<OnceCell<CacheEntry>>;

/// Session-wide memo of external lookups, keyed by lower-cased word.
///
/// Each word owns a once-initialized slot. Concurrent resolutions of the same
/// word share the slot, so only the first one performs a lookup. Entries are
/// never evicted; [`DefinitionCache::clear`] is the explicit session reset.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    slots: DashMap<String, Slot>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `word`, or `None` if it was never resolved.
    ///
    /// Never blocks and never triggers a lookup.
    pub fn get(&self, word: &str) -> Option<CacheEntry> {
        let key = cache_key(word);
        self.slots.get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Cached definition text for `word`, if one was found.
    pub fn definition(&self, word: &str) -> Option<String> {
        match self.get(word)? {
            CacheEntry::Defined(text) => Some(text),
            CacheEntry::Absent => None,
        }
    }

    /// Record an outcome for `word` unless one is already present.
    ///
    /// Returns `false` when the word was already resolved; the existing entry
    /// is kept.
    pub fn insert(&self, word: &str, entry: CacheEntry) -> bool {
        self.slot(&cache_key(word)).set(entry).is_ok()
    }

    /// Number of resolved words. In-flight lookups are not counted.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Lookups already in flight finish into orphaned slots.
    pub fn clear(&self) {
        self.slots.clear();
    }

    pub(crate) fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(key.to_string()).or_default().value())
    }
}

pub(crate) fn cache_key(word: &str) -> String {
    word.to_lowercase()
}
