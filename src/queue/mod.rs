//! The thumbnail creation queue
//!
//! This module handles:
//! - The request value and its priority ordering (request.rs)
//! - The blocking, deduplicating priority queue (creation_queue.rs)

pub mod creation_queue;
pub mod request;
