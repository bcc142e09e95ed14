//! Background thumbnail generation pipeline for the photo organizer.
//!
//! Turning large source images into displayable thumbnails must never
//! block the interface and must never grow memory without bound. The
//! pipeline that guarantees this:
//!
//! - a blocking, priority-ordered, deduplicating [`RequestQueue`] of
//!   generation requests, where re-submission escalates instead of
//!   duplicating,
//! - a capacity-bounded [`PictureCache`] of decoded source images with
//!   hint-biased eviction,
//! - a [`CacheLoader`] that speculatively warms the cache in the
//!   background and can stop every stale load in a hurry,
//! - a [`WorkerPool`] of long-lived threads that materialize
//!   thumbnails and deliver them to the UI thread over a channel.
//!
//! [`ThumbnailService`] wires the pieces together; the application
//! constructs one at startup and passes it to every view that needs
//! thumbnails.

pub mod cache;
pub mod data;
pub mod error;
pub mod queue;
pub mod service;
pub mod settings;
pub mod source;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::loader::CacheLoader;
pub use cache::picture_cache::{CacheStats, PictureCache};
pub use data::{
    AssetKey, CancellationToken, RequestorId, Thumbnail, ThumbnailEvent, ThumbnailSubject,
};
pub use error::DecodeError;
pub use queue::creation_queue::{RequestQueue, SubmitOutcome};
pub use queue::request::{Priority, ThumbnailRequest};
pub use service::ThumbnailService;
pub use settings::Settings;
pub use source::decoder::{FileDecoder, ImageDecoder};
pub use source::picture::{DecodedImage, SourcePicture, SourceStatus, SourceStatusListener};
pub use worker::pool::WorkerPool;
