//! Source image loading
//!
//! This module handles:
//! - The decode primitive the pipeline is built on (decoder.rs)
//! - Asynchronous, cancellable source loads with status
//!   notifications (picture.rs)

pub mod decoder;
pub mod picture;
