//! Shared data structures for the thumbnail pipeline
//!
//! These types flow between the request queue, the picture cache,
//! the worker threads and the UI layer.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::DynamicImage;

/// Canonical identifier of a source image asset.
///
/// Keys are compared by value and cheap to clone, so the same key can
/// travel between the queue, the cache and the worker threads without
/// copying the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(Arc<str>);

impl AssetKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        AssetKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        AssetKey(Arc::from(key))
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        AssetKey(Arc::from(key))
    }
}

impl From<&Path> for AssetKey {
    fn from(path: &Path) -> Self {
        AssetKey(Arc::from(path.to_string_lossy().as_ref()))
    }
}

/// Identity of the view or other consumer that asked for a thumbnail.
///
/// The queue deduplicates requests by this identity: one requestor can
/// have at most one pending request at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestorId(pub u64);

impl fmt::Display for RequestorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requestor-{}", self.0)
    }
}

/// What a generation request is about: which asset, the rotation the
/// collection metadata prescribes, and the square bounding box the
/// thumbnail is scaled to fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSubject {
    /// The source asset to decode
    pub key: AssetKey,
    /// Rotation in degrees applied after decoding
    pub rotation: i32,
    /// Edge length of the square bounding box for the thumbnail
    pub size: u32,
}

impl ThumbnailSubject {
    pub fn new(key: AssetKey, rotation: i32, size: u32) -> Self {
        Self {
            key,
            rotation,
            size,
        }
    }
}

/// A finished thumbnail as delivered to the UI layer.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// The asset this thumbnail was derived from
    pub key: AssetKey,
    /// The scaled bitmap
    pub image: DynamicImage,
}

impl Thumbnail {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Result of a generation request.
///
/// Workers never touch view state directly. They push one of these
/// onto a channel and the UI event loop drains it on its own thread.
#[derive(Debug, Clone)]
pub enum ThumbnailEvent {
    /// The thumbnail was rendered and is ready for display
    Ready {
        requestor: RequestorId,
        thumbnail: Thumbnail,
    },
    /// The source could not be decoded; show a placeholder instead
    Failed {
        requestor: RequestorId,
        message: String,
    },
}

/// Cooperative cancellation for long-running decodes.
///
/// The token is set at most once and stays set. Decodes poll it at
/// safe points and abandon the remaining work once it has fired; a
/// decode that is already past its last safe point may still finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
