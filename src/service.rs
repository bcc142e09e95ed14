//! The thumbnail service facade
//!
//! One `ThumbnailService` is constructed at application startup and
//! handed by reference to every view that needs thumbnails. It owns
//! the queue, the cache, the prefetch loader and the worker pool, so
//! ownership and shutdown are explicit instead of hiding behind
//! process-wide statics.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::cache::loader::CacheLoader;
use crate::cache::picture_cache::{CacheStats, PictureCache};
use crate::data::{AssetKey, RequestorId, ThumbnailEvent, ThumbnailSubject};
use crate::queue::creation_queue::{RequestQueue, SubmitOutcome};
use crate::queue::request::Priority;
use crate::settings::Settings;
use crate::source::decoder::{FileDecoder, ImageDecoder};
use crate::worker::pool::WorkerPool;

/// The background thumbnail generation pipeline.
///
/// Views submit requests and drain the returned event channel on the
/// UI thread; everything in between happens on background threads.
pub struct ThumbnailService {
    settings: Settings,
    queue: Arc<RequestQueue>,
    cache: Arc<PictureCache>,
    loader: Arc<CacheLoader>,
    workers: Option<WorkerPool>,
}

impl ThumbnailService {
    /// Build the pipeline around the given decode primitive.
    ///
    /// Returns the service and the event channel the UI event loop
    /// must drain. At least one worker is always spawned.
    pub fn new(
        settings: Settings,
        decoder: Arc<dyn ImageDecoder>,
    ) -> (Self, Receiver<ThumbnailEvent>) {
        let (events_tx, events_rx) = mpsc::channel();
        let queue = Arc::new(RequestQueue::new());
        let cache = Arc::new(PictureCache::new(settings.max_cache_size));
        let loader = CacheLoader::new(cache.clone(), decoder.clone());
        let workers = WorkerPool::spawn(
            settings.worker_count.max(1),
            queue.clone(),
            cache.clone(),
            decoder,
            events_tx,
        );

        let service = Self {
            settings,
            queue,
            cache,
            loader,
            workers: Some(workers),
        };
        (service, events_rx)
    }

    /// Build the pipeline with the filesystem decoder used in
    /// production.
    pub fn with_file_decoder(settings: Settings) -> (Self, Receiver<ThumbnailEvent>) {
        Self::new(settings, Arc::new(FileDecoder))
    }

    /// Ask for a thumbnail of `key`, rotated per the collection
    /// metadata, at the configured thumbnail size.
    ///
    /// Re-submitting for the same requestor never duplicates: the
    /// pending request is escalated instead.
    pub fn request_thumbnail(
        &self,
        requestor: RequestorId,
        key: AssetKey,
        rotation: i32,
        priority: Priority,
        force_rebuild: bool,
    ) -> SubmitOutcome {
        let subject = ThumbnailSubject::new(key, rotation, self.settings.thumbnail_size);
        self.queue.submit(requestor, subject, priority, force_rebuild)
    }

    /// Cancel the requestor's pending request, if a worker has not
    /// taken it yet.
    pub fn cancel_thumbnail_request(&self, requestor: RequestorId) {
        self.queue.remove(requestor);
    }

    /// Number of requests waiting on the queue (for status displays)
    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    /// Start a speculative background load so the decoded source is
    /// already cached when a request for it arrives.
    pub fn prefetch(&self, key: AssetKey, rotation: i32) {
        self.loader.prefetch(key, rotation);
    }

    /// Stop every in-flight prefetch load.
    pub fn stop_prefetch(&self) {
        self.loader.stop_all();
    }

    /// Stop every in-flight prefetch load except the one for `key`.
    /// Returns true when a load for `key` was already running.
    pub fn stop_prefetch_except(&self, key: &AssetKey) -> bool {
        self.loader.stop_all_except(key)
    }

    /// Hint that a view no longer needs the decoded source for `key`
    pub fn suggest_cache_removal(&self, key: AssetKey) {
        self.cache.suggest_removal(key);
    }

    /// Reconfigure the cache capacity at runtime
    pub fn configure_cache(&self, max_entries: usize) {
        self.cache.set_max_entries(max_entries);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn is_cached(&self, key: &AssetKey) -> bool {
        self.cache.contains(key)
    }

    pub fn cached_image_count(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stop the pipeline: pending requests are dropped, in-flight
    /// prefetches are cancelled and the workers are joined. Also runs
    /// on drop.
    pub fn shutdown(&mut self) {
        self.queue.clear();
        self.queue.close();
        self.loader.stop_all();
        if let Some(workers) = self.workers.take() {
            workers.join();
        }
    }
}

impl Drop for ThumbnailService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
