//! Blocking, priority-ordered, deduplicating queue of thumbnail
//! requests
//!
//! The queue is the hand-off point between the UI layer and the worker
//! threads. A view submits what it needs; a worker blocks until the
//! most urgent request exists and takes it. Each requestor has at most
//! one entry on the queue at any time: re-submitting escalates the
//! existing entry instead of duplicating it.

use std::sync::{Condvar, Mutex};

use crate::data::{RequestorId, ThumbnailSubject};
use crate::queue::request::{Priority, ThumbnailRequest};

/// What `submit` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new entry was placed on the queue
    Enqueued,
    /// The requestor already had an entry; its priority and
    /// force-rebuild flag were merged into it
    Escalated,
}

struct QueueState {
    pending: Vec<ThumbnailRequest>,
    next_seq: u64,
    closed: bool,
}

/// The process-wide request queue, created once at startup and shared
/// by reference between the views and the worker pool.
pub struct RequestQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                next_seq: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Put a request on the queue, or escalate the requestor's
    /// existing entry.
    ///
    /// Escalation can only improve the priority and can only turn the
    /// force-rebuild flag on, never off.
    pub fn submit(
        &self,
        requestor: RequestorId,
        subject: ThumbnailSubject,
        priority: Priority,
        force_rebuild: bool,
    ) -> SubmitOutcome {
        let mut state = self.lock();

        if let Some(existing) = state
            .pending
            .iter_mut()
            .find(|r| r.requestor() == requestor)
        {
            existing.increase_priority_to(priority);
            existing.merge_force_rebuild(force_rebuild);
            return SubmitOutcome::Escalated;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .pending
            .push(ThumbnailRequest::new(
                requestor,
                subject,
                priority,
                force_rebuild,
                seq,
            ));
        self.available.notify_one();
        SubmitOutcome::Enqueued
    }

    /// Take the most urgent request, blocking while the queue is
    /// empty.
    ///
    /// Returns `None` only once the queue has been closed; workers use
    /// that as their shutdown signal.
    pub fn take_highest_priority(&self) -> Option<ThumbnailRequest> {
        let mut state = self.lock();
        loop {
            if let Some(index) = Self::most_urgent_index(&state.pending) {
                return Some(state.pending.remove(index));
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .expect("request queue lock poisoned");
        }
    }

    /// Cancel a pending request. No-op if the requestor has no entry
    /// (for instance because a worker already took it).
    pub fn remove(&self, requestor: RequestorId) {
        self.lock().pending.retain(|r| r.requestor() != requestor);
    }

    pub fn size(&self) -> usize {
        self.lock().pending.len()
    }

    /// Drop every pending request
    pub fn clear(&self) {
        self.lock().pending.clear();
    }

    /// Close the queue for shutdown. Blocked workers wake up and see
    /// `None` once the remaining requests are drained.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    fn most_urgent_index(pending: &[ThumbnailRequest]) -> Option<usize> {
        pending
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("request queue lock poisoned")
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}
