//! Capacity-bounded cache of decoded source images
//!
//! Decoding a source picture is by far the most expensive step of
//! thumbnail generation, so finished decodes are kept in memory and
//! reused. The cache never grows past its configured capacity:
//! consumers hint which entries they no longer need, hinted entries
//! are evicted first (in hint order), and when the hints run out the
//! cache falls back to evicting arbitrary entries.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::data::AssetKey;
use crate::source::picture::DecodedImage;

/// Counters for cache diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found a decoded image
    pub hits: u64,
    /// Lookups that came up empty
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries stored
    pub insertions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 - 100.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct CacheState {
    entries: HashMap<AssetKey, Arc<DecodedImage>>,
    /// Keys consumers no longer need, in the order they were hinted.
    /// Consumed front-to-back when the cache has to evict.
    removal_hints: VecDeque<AssetKey>,
    max_entries: usize,
    stats: CacheStats,
}

/// The process-wide cache of decoded source images.
///
/// One instance is created at startup and shared by reference between
/// the workers, the prefetcher and the service facade. All mutation
/// happens behind a single lock.
pub struct PictureCache {
    state: Mutex<CacheState>,
}

impl PictureCache {
    /// Create a cache holding at most `max_entries` decoded images.
    /// A capacity below 1 disables caching entirely.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                removal_hints: VecDeque::new(),
                max_entries,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn get(&self, key: &AssetKey) -> Option<Arc<DecodedImage>> {
        let mut state = self.lock();
        match state.entries.get(key).cloned() {
            Some(image) => {
                state.stats.hits += 1;
                Some(image)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Presence check that does not touch the hit/miss counters
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Store a decoded image, evicting first if the cache is full.
    ///
    /// No-op when caching is disabled or the key is already present.
    /// Only finished decodes can be stored: the type carries no
    /// loading or error state.
    pub fn put(&self, key: AssetKey, image: Arc<DecodedImage>) {
        let mut state = self.lock();
        if state.max_entries < 1 {
            return;
        }
        if state.entries.contains_key(&key) {
            return;
        }
        if state.entries.len() >= state.max_entries {
            let limit = state.max_entries - 1;
            Self::evict_down_to(&mut state, limit);
        }
        state.entries.insert(key, image);
        state.stats.insertions += 1;
    }

    /// Note that a consumer no longer needs `key`.
    ///
    /// Nothing is evicted immediately; the hint only biases which
    /// entry goes first when the cache next has to make room.
    pub fn suggest_removal(&self, key: AssetKey) {
        self.lock().removal_hints.push_back(key);
    }

    pub fn remove(&self, key: &AssetKey) {
        self.lock().entries.remove(key);
    }

    /// Drop everything and release as much memory as possible
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.removal_hints.clear();
        state.entries.shrink_to_fit();
        state.removal_hints.shrink_to_fit();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.lock().max_entries
    }

    /// Reconfigure the capacity at runtime. Shrinking below the
    /// current size evicts immediately; 0 disables caching and drops
    /// every entry.
    pub fn set_max_entries(&self, max_entries: usize) {
        let mut state = self.lock();
        state.max_entries = max_entries;
        Self::evict_down_to(&mut state, max_entries);
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Evict until at most `limit` entries remain. Hinted keys go
    /// first, in hint order; each hint is consumed once and hints for
    /// absent keys are skipped. When the hints run out, arbitrary
    /// entries are evicted in iteration order.
    fn evict_down_to(state: &mut CacheState, limit: usize) {
        while state.entries.len() > limit {
            if let Some(hint) = state.removal_hints.pop_front() {
                if state.entries.remove(&hint).is_some() {
                    state.stats.evictions += 1;
                }
                continue;
            }

            let Some(victim) = state.entries.keys().next().cloned() else {
                break;
            };
            state.entries.remove(&victim);
            state.stats.evictions += 1;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("picture cache lock poisoned")
    }
}
