// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-out and heartbeat scheduling.
//!
//! Cooperative, single-threaded: the driver's tick loop asks for fired
//! entries and runs them one at a time. Equal due-times fire in
//! insertion order. Handles are monotonic and safe to cancel after
//! expiry.

use loam_core::{CalloutHandle, ObjectId, TimerId};
use loam_mudlib::Action;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// What a call-out does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum CalloutPayload {
    /// Run mudlib actions against a live instance.
    Script {
        target: ObjectId,
        actions: Vec<Action>,
    },
    /// A named driver timer (disconnect grace, reset cycle, ...).
    Timer(TimerId),
}

/// A fired call-out, in firing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub handle: CalloutHandle,
    pub payload: CalloutPayload,
}

#[derive(Debug, Clone)]
struct Entry {
    handle: CalloutHandle,
    due: Instant,
    seq: u64,
    payload: CalloutPayload,
}

/// Manages call-outs and the heartbeat subscription set.
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    heartbeats: BTreeSet<ObjectId>,
    next_handle: u64,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a payload after at least `delay`. A zero delay fires on
    /// the next tick, never within the current one.
    pub fn call_out(
        &mut self,
        payload: CalloutPayload,
        delay: Duration,
        now: Instant,
    ) -> CalloutHandle {
        self.next_handle += 1;
        self.next_seq += 1;
        let handle = CalloutHandle(self.next_handle);
        self.entries.push(Entry {
            handle,
            due: now + delay,
            seq: self.next_seq,
            payload,
        });
        handle
    }

    /// Schedule (or reschedule) a named driver timer. Setting an
    /// already-pending timer replaces its deadline.
    pub fn set_timer(&mut self, id: TimerId, delay: Duration, now: Instant) -> CalloutHandle {
        self.cancel_timer(&id);
        self.call_out(CalloutPayload::Timer(id), delay, now)
    }

    /// Cancel a named timer. Returns whether one was pending.
    pub fn cancel_timer(&mut self, id: &TimerId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(&entry.payload, CalloutPayload::Timer(t) if t == id));
        before != self.entries.len()
    }

    pub fn timer_pending(&self, id: &TimerId) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(&entry.payload, CalloutPayload::Timer(t) if t == id))
    }

    /// Cancel by handle. Idempotent; cancelling after expiry is a no-op.
    pub fn remove_call_out(&mut self, handle: CalloutHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        before != self.entries.len()
    }

    /// Cancel every script call-out keyed on an instance (destruction).
    pub fn cancel_for_object(&mut self, target: ObjectId) -> usize {
        let before = self.entries.len();
        self.entries.retain(
            |entry| !matches!(&entry.payload, CalloutPayload::Script { target: t, .. } if *t == target),
        );
        before - self.entries.len()
    }

    /// Drain everything due by `now`, ordered by (due time, insertion).
    pub fn fired(&mut self, now: Instant) -> Vec<Fired> {
        let mut due: Vec<Entry> = Vec::new();
        let mut remaining: Vec<Entry> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.due <= now {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;

        due.sort_by(|a, b| a.due.cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter()
            .map(|entry| Fired {
                handle: entry.handle,
                payload: entry.payload,
            })
            .collect()
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    pub fn pending_callouts(&self) -> usize {
        self.entries.len()
    }

    // ---------------------------------------------------------------
    // Heartbeats
    // ---------------------------------------------------------------

    /// Subscribe an instance. Returns false if it was already
    /// subscribed.
    pub fn register_heartbeat(&mut self, id: ObjectId) -> bool {
        self.heartbeats.insert(id)
    }

    pub fn unregister_heartbeat(&mut self, id: ObjectId) -> bool {
        self.heartbeats.remove(&id)
    }

    pub fn has_heartbeat(&self, id: ObjectId) -> bool {
        self.heartbeats.contains(&id)
    }

    /// Subscribers in deterministic order for one sweep.
    pub fn heartbeat_members(&self) -> Vec<ObjectId> {
        self.heartbeats.iter().copied().collect()
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeats.len()
    }

    /// Drop all state (shutdown path).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.heartbeats.clear();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
