//! The worker pool
//!
//! A fixed set of long-lived threads pulls the most urgent request off
//! the queue, materializes the decoded source (from the cache when it
//! can, from a fresh decode when it must), scales it down and sends
//! the result to the UI layer over the event channel. Workers only
//! terminate when the queue is closed at shutdown.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use image::imageops::FilterType;
use image::DynamicImage;

use crate::cache::picture_cache::PictureCache;
use crate::data::{Thumbnail, ThumbnailEvent};
use crate::queue::creation_queue::RequestQueue;
use crate::queue::request::ThumbnailRequest;
use crate::source::decoder::ImageDecoder;
use crate::source::picture::{SourcePicture, SourceStatus};

/// The fixed set of background threads behind the request queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` threads pulling from `queue`.
    pub fn spawn(
        worker_count: usize,
        queue: Arc<RequestQueue>,
        cache: Arc<PictureCache>,
        decoder: Arc<dyn ImageDecoder>,
        events: Sender<ThumbnailEvent>,
    ) -> Self {
        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let queue = queue.clone();
            let cache = cache.clone();
            let decoder = decoder.clone();
            let events = events.clone();
            let handle = thread::Builder::new()
                .name(format!("thumbnail-worker-{index}"))
                .spawn(move || worker_loop(&queue, &cache, &decoder, &events))
                .expect("failed to spawn thumbnail worker thread");
            handles.push(handle);
        }
        Self { handles }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for the workers to finish. Call after closing the queue,
    /// otherwise this blocks forever.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    queue: &RequestQueue,
    cache: &Arc<PictureCache>,
    decoder: &Arc<dyn ImageDecoder>,
    events: &Sender<ThumbnailEvent>,
) {
    while let Some(request) = queue.take_highest_priority() {
        create_thumbnail(&request, cache, decoder, events);
    }
}

/// Materialize one thumbnail and deliver the result.
///
/// A failed request produces a `Failed` event and nothing more; it
/// never takes the worker down with it. A cancelled decode produces no
/// event at all, since whoever cancelled it no longer wants an answer.
fn create_thumbnail(
    request: &ThumbnailRequest,
    cache: &Arc<PictureCache>,
    decoder: &Arc<dyn ImageDecoder>,
    events: &Sender<ThumbnailEvent>,
) {
    let subject = request.subject();

    let cached = if request.force_rebuild() {
        None
    } else {
        cache.get(&subject.key)
    };

    let source = match cached {
        Some(image) => image,
        None => {
            let picture =
                SourcePicture::new(subject.key.clone(), subject.rotation, decoder.clone());
            match picture.load() {
                SourceStatus::Ready(image) => {
                    cache.put(subject.key.clone(), image.clone());
                    image
                }
                SourceStatus::Error(message) => {
                    if picture.is_cancelled() {
                        return;
                    }
                    eprintln!("⚠️  Could not decode {}: {}", subject.key, message);
                    let _ = events.send(ThumbnailEvent::Failed {
                        requestor: request.requestor(),
                        message,
                    });
                    return;
                }
                // A synchronous load only ever finishes Ready or Error
                SourceStatus::Uninitialized | SourceStatus::Loading => return,
            }
        }
    };

    let scaled = scale_to_fit(source.image(), subject.size);
    let _ = events.send(ThumbnailEvent::Ready {
        requestor: request.requestor(),
        thumbnail: Thumbnail {
            key: subject.key.clone(),
            image: scaled,
        },
    });
}

/// Scale a decoded source down to fit the requested square bounding
/// box, preserving aspect ratio. Sources that already fit are passed
/// through unscaled.
fn scale_to_fit(image: &DynamicImage, size: u32) -> DynamicImage {
    if image.width() <= size && image.height() <= size {
        return image.clone();
    }
    image.resize(size, size, FilterType::Lanczos3)
}
