//! In-memory caching of decoded source images
//!
//! This module handles:
//! - The capacity-bounded cache of decoded pictures (picture_cache.rs)
//! - Speculative background loads that warm the cache (loader.rs)

pub mod loader;
pub mod picture_cache;
