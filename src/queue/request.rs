//! One entry on the thumbnail creation queue

use std::cmp::Ordering;

use crate::data::{RequestorId, ThumbnailSubject};

/// Priority of a generation request.
///
/// The variants are declared most-urgent first, so the derived
/// ordering makes `High < Medium < Low` and `min` of two priorities is
/// the more urgent one. An explicit enum (rather than small integers)
/// keeps the ordering honest if levels are ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// The picture is on screen right now
    High,
    /// The picture is about to be on screen
    Medium,
    /// Background and batch work
    Low,
}

/// A request to produce a thumbnail for one requestor.
///
/// Requests are ordered by priority first and arrival order second, so
/// equal-priority requests come off the queue first-in-first-out.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    requestor: RequestorId,
    subject: ThumbnailSubject,
    priority: Priority,
    force_rebuild: bool,
    /// Monotonic arrival number, the tie-break among equal priorities
    seq: u64,
}

impl ThumbnailRequest {
    pub(crate) fn new(
        requestor: RequestorId,
        subject: ThumbnailSubject,
        priority: Priority,
        force_rebuild: bool,
        seq: u64,
    ) -> Self {
        Self {
            requestor,
            subject,
            priority,
            force_rebuild,
            seq,
        }
    }

    pub fn requestor(&self) -> RequestorId {
        self.requestor
    }

    pub fn subject(&self) -> &ThumbnailSubject {
        &self.subject
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// When set, the thumbnail is rebuilt from source even if a
    /// decoded image is already cached.
    pub fn force_rebuild(&self) -> bool {
        self.force_rebuild
    }

    /// Raise the priority to `priority` if it is more urgent than the
    /// current one. Priority only ever improves, never regresses.
    pub fn increase_priority_to(&mut self, priority: Priority) {
        if priority < self.priority {
            self.priority = priority;
        }
    }

    pub(crate) fn merge_force_rebuild(&mut self, force_rebuild: bool) {
        self.force_rebuild |= force_rebuild;
    }
}

impl PartialEq for ThumbnailRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for ThumbnailRequest {}

impl PartialOrd for ThumbnailRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ThumbnailRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq).cmp(&(other.priority, other.seq))
    }
}
