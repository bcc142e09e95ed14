//! Asynchronous, cancellable loading of source pictures
//!
//! A [`SourcePicture`] owns one decode of one asset. It can run the
//! decode on the calling thread (the worker path) or on a freshly
//! spawned background thread (the prefetch path). Either way it walks
//! the same lifecycle: `Uninitialized -> Loading -> Ready | Error`,
//! and registered listeners hear about every transition.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::data::{AssetKey, CancellationToken};
use crate::source::decoder::ImageDecoder;

/// Status message used when a load ends because it was stopped rather
/// than because it failed.
pub const CANCELLED_MESSAGE: &str = "load cancelled";

/// A decoded source image with its rotation already applied.
///
/// Only finished decodes produce one of these, so anything the cache
/// hands out is ready for scaling.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    key: AssetKey,
    image: DynamicImage,
    rotation: i32,
}

impl DecodedImage {
    pub fn new(key: AssetKey, image: DynamicImage, rotation: i32) -> Self {
        Self {
            key,
            image,
            rotation,
        }
    }

    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Rotation in degrees that was applied after decoding
    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Lifecycle of a source picture load.
#[derive(Debug, Clone)]
pub enum SourceStatus {
    /// No decode has started yet
    Uninitialized,
    /// A decode is running
    Loading,
    /// The decode finished and the bitmap is available
    Ready(Arc<DecodedImage>),
    /// The decode failed or was stopped
    Error(String),
}

impl SourceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SourceStatus::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SourceStatus::Error(_))
    }

    /// Ready and Error are the two terminal states
    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.is_error()
    }
}

/// Gets told about every status transition of a [`SourcePicture`].
pub trait SourceStatusListener: Send + Sync {
    fn source_status_changed(&self, key: &AssetKey, status: &SourceStatus);
}

struct PictureInner {
    key: AssetKey,
    rotation: i32,
    decoder: Arc<dyn ImageDecoder>,
    token: CancellationToken,
    status: Mutex<SourceStatus>,
    listeners: Mutex<Vec<Arc<dyn SourceStatusListener>>>,
    load_time: Mutex<Option<Duration>>,
}

/// One cancellable decode of one source asset.
///
/// Handles are cheap clones of shared state, so the thread doing the
/// decode and the threads watching it all see the same status. A
/// picture is single-shot: once a load has started, further `load`
/// calls return without decoding again.
#[derive(Clone)]
pub struct SourcePicture {
    inner: Arc<PictureInner>,
}

impl SourcePicture {
    pub fn new(key: AssetKey, rotation: i32, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self {
            inner: Arc::new(PictureInner {
                key,
                rotation,
                decoder,
                token: CancellationToken::new(),
                status: Mutex::new(SourceStatus::Uninitialized),
                listeners: Mutex::new(Vec::new()),
                load_time: Mutex::new(None),
            }),
        }
    }

    pub fn key(&self) -> &AssetKey {
        &self.inner.key
    }

    pub fn rotation(&self) -> i32 {
        self.inner.rotation
    }

    pub fn status(&self) -> SourceStatus {
        self.inner
            .status
            .lock()
            .expect("source status lock poisoned")
            .clone()
    }

    /// How long the decode took, once the picture is Ready
    pub fn load_time(&self) -> Option<Duration> {
        *self
            .inner
            .load_time
            .lock()
            .expect("load time lock poisoned")
    }

    pub fn add_listener(&self, listener: Arc<dyn SourceStatusListener>) {
        self.inner
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SourceStatusListener>) {
        self.inner
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Ask the running decode to stop at its next safe point.
    ///
    /// The picture will finish with an `Error` status; callers that
    /// issued the stop should not treat that as a failure.
    pub fn stop_loading(&self) {
        self.inner.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Decode on the calling thread and return the final status.
    ///
    /// Used by the worker threads, which are already in the
    /// background. Returns the current status unchanged if a load was
    /// already started.
    pub fn load(&self) -> SourceStatus {
        if !self.begin_loading() {
            return self.status();
        }
        self.run_decode()
    }

    /// Decode on a newly spawned background thread.
    ///
    /// Used by the cache prefetcher so the caller can keep going while
    /// the load chugs along. No-op if a load was already started.
    pub fn load_in_thread(&self) {
        if !self.begin_loading() {
            return;
        }

        let picture = self.clone();
        let spawned = thread::Builder::new()
            .name("picture-load".to_string())
            .spawn(move || {
                picture.run_decode();
            });

        if let Err(e) = spawned {
            self.set_status(SourceStatus::Error(format!(
                "could not spawn loader thread: {e}"
            )));
        }
    }

    /// The one allowed transition into Loading. Refuses when a decode
    /// is already running or the picture has already finished.
    fn begin_loading(&self) -> bool {
        {
            let mut status = self
                .inner
                .status
                .lock()
                .expect("source status lock poisoned");
            match *status {
                SourceStatus::Uninitialized => *status = SourceStatus::Loading,
                _ => return false,
            }
        }
        self.notify(&SourceStatus::Loading);
        true
    }

    fn run_decode(&self) -> SourceStatus {
        let started = Instant::now();
        let decoded = self
            .inner
            .decoder
            .decode(&self.inner.key, &self.inner.token);

        let status = match decoded {
            Ok(bitmap) => {
                let rotated = apply_rotation(bitmap, self.inner.rotation);
                if self.inner.token.is_cancelled() {
                    SourceStatus::Error(CANCELLED_MESSAGE.to_string())
                } else {
                    *self
                        .inner
                        .load_time
                        .lock()
                        .expect("load time lock poisoned") = Some(started.elapsed());
                    SourceStatus::Ready(Arc::new(DecodedImage::new(
                        self.inner.key.clone(),
                        rotated,
                        self.inner.rotation,
                    )))
                }
            }
            Err(err) if err.is_cancelled() => SourceStatus::Error(CANCELLED_MESSAGE.to_string()),
            Err(err) => SourceStatus::Error(err.to_string()),
        };

        self.set_status(status.clone());
        status
    }

    fn set_status(&self, status: SourceStatus) {
        *self
            .inner
            .status
            .lock()
            .expect("source status lock poisoned") = status.clone();
        self.notify(&status);
    }

    fn notify(&self, status: &SourceStatus) {
        // Snapshot first so a listener may unregister itself from
        // inside its own callback without deadlocking.
        let listeners: Vec<Arc<dyn SourceStatusListener>> = self
            .inner
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .clone();

        for listener in listeners {
            listener.source_status_changed(&self.inner.key, status);
        }
    }
}

/// Apply the collection's rotation metadata.
///
/// Only quarter turns are meaningful for display; anything else is
/// rounded to the nearest one.
fn apply_rotation(image: DynamicImage, degrees: i32) -> DynamicImage {
    match quarter_turns(degrees) {
        1 => image.rotate90(),
        2 => image.rotate180(),
        3 => image.rotate270(),
        _ => image,
    }
}

fn quarter_turns(degrees: i32) -> i32 {
    let normalized = degrees.rem_euclid(360);
    ((normalized as f32 / 90.0).round() as i32) % 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DecodePlan, FakeDecoder};
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_load_reaches_ready() {
        let decoder = FakeDecoder::new();
        decoder.plan(
            "/photos/a.jpg",
            DecodePlan::Succeed {
                width: 8,
                height: 4,
            },
        );

        let picture = SourcePicture::new(AssetKey::from("/photos/a.jpg"), 0, decoder);
        let status = picture.load();

        match status {
            SourceStatus::Ready(image) => {
                assert_eq!(image.width(), 8);
                assert_eq!(image.height(), 4);
                assert_eq!(image.key(), picture.key());
            }
            other => panic!("expected Ready, got {:?}", other),
        }
        assert!(picture.load_time().is_some());
    }

    #[test]
    fn test_rotation_is_applied() {
        let decoder = FakeDecoder::new();
        decoder.plan(
            "/photos/a.jpg",
            DecodePlan::Succeed {
                width: 8,
                height: 4,
            },
        );

        let picture = SourcePicture::new(AssetKey::from("/photos/a.jpg"), 90, decoder);
        let status = picture.load();

        match status {
            SourceStatus::Ready(image) => {
                // A quarter turn swaps the dimensions
                assert_eq!(image.width(), 4);
                assert_eq!(image.height(), 8);
                assert_eq!(image.rotation(), 90);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_decode_ends_in_error() {
        let decoder = FakeDecoder::new();
        decoder.plan("/photos/bad.jpg", DecodePlan::Fail("corrupt".to_string()));

        let picture = SourcePicture::new(AssetKey::from("/photos/bad.jpg"), 0, decoder);
        let status = picture.load();

        assert!(status.is_error());
        assert!(!picture.is_cancelled());
    }

    #[test]
    fn test_stop_loading_ends_in_error() {
        let decoder = FakeDecoder::new();
        let picture = SourcePicture::new(AssetKey::from("/photos/a.jpg"), 0, decoder);

        picture.stop_loading();
        let status = picture.load();

        assert!(status.is_error());
        assert!(picture.is_cancelled());
        match status {
            SourceStatus::Error(message) => assert_eq!(message, CANCELLED_MESSAGE),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_second_load_is_refused() {
        let decoder = FakeDecoder::new();
        let key = AssetKey::from("/photos/a.jpg");
        let picture = SourcePicture::new(key.clone(), 0, decoder.clone());

        picture.load();
        picture.load();

        // The decoder only ever ran once
        assert_eq!(decoder.decodes_started(&key), 1);
    }

    struct RecordingListener {
        seen: StdMutex<Vec<String>>,
    }

    impl SourceStatusListener for RecordingListener {
        fn source_status_changed(&self, _key: &AssetKey, status: &SourceStatus) {
            let label = match status {
                SourceStatus::Uninitialized => "uninitialized",
                SourceStatus::Loading => "loading",
                SourceStatus::Ready(_) => "ready",
                SourceStatus::Error(_) => "error",
            };
            self.seen.lock().unwrap().push(label.to_string());
        }
    }

    #[test]
    fn test_listeners_hear_loading_then_ready() {
        let decoder = FakeDecoder::new();
        let picture = SourcePicture::new(AssetKey::from("/photos/a.jpg"), 0, decoder);

        let listener = Arc::new(RecordingListener {
            seen: StdMutex::new(Vec::new()),
        });
        picture.add_listener(listener.clone());
        picture.load();

        assert_eq!(*listener.seen.lock().unwrap(), vec!["loading", "ready"]);
    }

    #[test]
    fn test_removed_listener_hears_nothing() {
        let decoder = FakeDecoder::new();
        let picture = SourcePicture::new(AssetKey::from("/photos/a.jpg"), 0, decoder);

        let listener = Arc::new(RecordingListener {
            seen: StdMutex::new(Vec::new()),
        });
        let as_dyn: Arc<dyn SourceStatusListener> = listener.clone();
        picture.add_listener(as_dyn.clone());
        picture.remove_listener(&as_dyn);
        picture.load();

        assert!(listener.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_quarter_turn_rounding() {
        assert_eq!(quarter_turns(0), 0);
        assert_eq!(quarter_turns(90), 1);
        assert_eq!(quarter_turns(180), 2);
        assert_eq!(quarter_turns(270), 3);
        assert_eq!(quarter_turns(360), 0);
        assert_eq!(quarter_turns(-90), 3);
        // Arbitrary angles snap to the nearest quarter turn
        assert_eq!(quarter_turns(100), 1);
        assert_eq!(quarter_turns(350), 0);
    }
}
