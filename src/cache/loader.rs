//! Speculative background loading into the picture cache
//!
//! When the user is looking at one picture, the pictures around it are
//! the likely next requests. The [`CacheLoader`] decodes them in the
//! background so that by the time a worker asks the cache, the answer
//! is already there. When the user jumps somewhere else, the loader
//! stops every stale in-flight load in a hurry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::cache::picture_cache::PictureCache;
use crate::data::AssetKey;
use crate::source::decoder::ImageDecoder;
use crate::source::picture::{SourcePicture, SourceStatus, SourceStatusListener};

/// Issues background source loads to pre-populate the picture cache.
///
/// The loader listens to every load it starts. A finished load goes
/// into the cache; a failed load is removed from the cache so a bad
/// speculative decode never poisons it. Either way the load leaves the
/// in-progress set.
pub struct CacheLoader {
    cache: Arc<PictureCache>,
    decoder: Arc<dyn ImageDecoder>,
    loads_in_progress: Mutex<HashMap<AssetKey, SourcePicture>>,
    /// Handle to ourselves, so loads can register the loader as their
    /// status listener
    me: Weak<CacheLoader>,
}

impl CacheLoader {
    pub fn new(cache: Arc<PictureCache>, decoder: Arc<dyn ImageDecoder>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            cache,
            decoder,
            loads_in_progress: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Start a background load for `key` unless the cache is disabled,
    /// the key is already cached, or a load for it is already running.
    pub fn prefetch(&self, key: AssetKey, rotation: i32) {
        if self.cache.max_entries() < 1 || self.cache.contains(&key) {
            return;
        }
        let Some(listener) = self.me.upgrade() else {
            return;
        };

        let picture = {
            let mut loads = self.lock_loads();
            if loads.contains_key(&key) {
                // Never start a second concurrent decode for the same asset
                return;
            }
            let picture = SourcePicture::new(key.clone(), rotation, self.decoder.clone());
            loads.insert(key, picture.clone());
            picture
        };

        picture.add_listener(listener);
        picture.load_in_thread();
    }

    /// Stop every in-flight background load.
    pub fn stop_all(&self) {
        for picture in self.lock_loads().values() {
            picture.stop_loading();
        }
    }

    /// Stop every in-flight background load except the one for
    /// `exempt_key`. Returns true when a load for `exempt_key` was
    /// already running, so the caller knows not to re-issue it.
    pub fn stop_all_except(&self, exempt_key: &AssetKey) -> bool {
        let loads = self.lock_loads();
        let mut in_progress = false;
        for (key, picture) in loads.iter() {
            if key == exempt_key {
                in_progress = true;
            } else {
                picture.stop_loading();
            }
        }
        in_progress
    }

    /// Keys with a background load currently running
    pub fn loads_in_progress(&self) -> Vec<AssetKey> {
        self.lock_loads().keys().cloned().collect()
    }

    fn untrack(&self, key: &AssetKey) {
        self.lock_loads().remove(key);
    }

    fn lock_loads(&self) -> std::sync::MutexGuard<'_, HashMap<AssetKey, SourcePicture>> {
        self.loads_in_progress
            .lock()
            .expect("loads-in-progress lock poisoned")
    }
}

impl SourceStatusListener for CacheLoader {
    fn source_status_changed(&self, key: &AssetKey, status: &SourceStatus) {
        match status {
            SourceStatus::Ready(image) => {
                self.cache.put(key.clone(), image.clone());
                self.untrack(key);
            }
            SourceStatus::Error(_) => {
                // Covers both real failures and stopped loads
                self.cache.remove(key);
                self.untrack(key);
            }
            SourceStatus::Uninitialized | SourceStatus::Loading => {}
        }
    }
}
