//! Runtime settings for the thumbnail pipeline
//!
//! The settings are serialized to JSON so they can be stored alongside
//! the rest of the application configuration and restored on startup.

use serde::{Deserialize, Serialize};

/// Default number of decoded source images kept in memory
pub const DEFAULT_MAX_CACHE_SIZE: usize = 24;

/// Default number of background worker threads
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Default size of generated thumbnails (square bounding box)
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Configuration for the thumbnail generation pipeline
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Maximum number of decoded source images kept in memory.
    /// A value below 1 disables the cache entirely.
    pub max_cache_size: usize,

    /// Number of worker threads pulling from the request queue
    pub worker_count: usize,

    /// Edge length of generated thumbnails in pixels
    pub thumbnail_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert to JSON string for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
