/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deadline-ordered priority queue of timer handles.
//!
//! Ordering key is `(deadline, sequence)`: earliest deadline first, equal
//! deadlines in creation order.  `BinaryHeap` cannot remove an arbitrary
//! element, so removal only drops the handle from the live set and the stale
//! heap entry is skipped when it surfaces.  When stale entries outnumber live
//! ones the heap is rebuilt without them.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::timer::TimerHandle;

/// Below this many stale entries the heap is never compacted.
const COMPACT_MIN_STALE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    deadline: Duration,
    sequence: u64,
    handle: TimerHandle,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.sequence.cmp(&other.sequence))
            .then_with(|| self.handle.cmp(&other.handle))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-ordered queue of pending timer handles.
///
/// A handle has at most one live entry at a time.
#[derive(Debug, Default)]
pub struct DeadlineQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,

    /// Handles whose heap entry is live.  Heap entries for any other handle
    /// are tombstones.
    queued: HashSet<TimerHandle>,
}

impl DeadlineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `handle`.  It must not already have a live entry.
    pub fn insert(&mut self, handle: TimerHandle, deadline: Duration, sequence: u64) {
        debug_assert!(!self.queued.contains(&handle), "{handle} queued twice");
        self.queued.insert(handle);
        self.heap.push(Reverse(QueueEntry {
            deadline,
            sequence,
            handle,
        }));
    }

    /// Pop every live entry with `deadline <= now`.
    ///
    /// The returned handles are in ascending `(deadline, sequence)` order.
    /// The result is a snapshot: entries inserted after this call returns are
    /// never part of it, whatever their deadline.
    pub fn pop_due(&mut self, now: Duration) -> Vec<TimerHandle> {
        let mut due = Vec::new();
        while let Some(&Reverse(entry)) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            self.heap.pop();
            if self.queued.remove(&entry.handle) {
                due.push(entry.handle);
            }
        }
        due
    }

    /// Logically delete the entry for `handle`.  No-op if it has none, for
    /// instance because it was already popped.
    pub fn remove(&mut self, handle: TimerHandle) {
        if self.queued.remove(&handle) {
            self.maybe_compact();
        }
    }

    /// Deadline of the earliest live entry.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        while let Some(&Reverse(entry)) = self.heap.peek() {
            if self.queued.contains(&entry.handle) {
                return Some(entry.deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.queued.clear();
    }

    fn maybe_compact(&mut self) {
        let stale = self.heap.len() - self.queued.len();
        if stale < COMPACT_MIN_STALE || stale <= self.queued.len() {
            return;
        }
        let queued = &self.queued;
        self.heap.retain(|Reverse(entry)| queued.contains(&entry.handle));
        debug!(
            removed = stale,
            remaining = self.heap.len(),
            "compacted deadline queue"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn h(id: u64) -> TimerHandle {
        TimerHandle(id)
    }

    #[test]
    fn pops_in_deadline_order() {
        let mut q = DeadlineQueue::new();
        q.insert(h(1), ms(300), 1);
        q.insert(h(2), ms(100), 2);
        q.insert(h(3), ms(200), 3);
        assert_eq!(q.pop_due(ms(1_000)), vec![h(2), h(3), h(1)]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_deadlines_pop_in_sequence_order() {
        let mut q = DeadlineQueue::new();
        q.insert(h(3), ms(1_000), 3);
        q.insert(h(1), ms(1_000), 1);
        q.insert(h(2), ms(1_000), 2);
        assert_eq!(q.pop_due(ms(1_000)), vec![h(1), h(2), h(3)]);
    }

    #[test]
    fn only_due_entries_are_popped() {
        let mut q = DeadlineQueue::new();
        q.insert(h(1), ms(100), 1);
        q.insert(h(2), ms(101), 2);
        assert_eq!(q.pop_due(ms(100)), vec![h(1)]);
        assert_eq!(q.len(), 1);
        assert!(q.pop_due(ms(100)).is_empty());
    }

    #[test]
    fn removed_entries_are_skipped() {
        let mut q = DeadlineQueue::new();
        q.insert(h(1), ms(10), 1);
        q.insert(h(2), ms(20), 2);
        q.remove(h(1));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(ms(100)), vec![h(2)]);
        assert!(q.heap.is_empty());
    }

    #[test]
    fn removing_a_popped_handle_is_a_noop() {
        let mut q = DeadlineQueue::new();
        q.insert(h(1), ms(10), 1);
        q.insert(h(2), ms(50), 2);
        assert_eq!(q.pop_due(ms(10)), vec![h(1)]);
        q.remove(h(1));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(ms(50)));
    }

    #[test]
    fn next_deadline_skips_removed_entries() {
        let mut q = DeadlineQueue::new();
        q.insert(h(1), ms(10), 1);
        q.insert(h(2), ms(20), 2);
        q.remove(h(1));
        assert_eq!(q.next_deadline(), Some(ms(20)));
        q.remove(h(2));
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn heavy_removal_compacts_the_heap() {
        let mut q = DeadlineQueue::new();
        for i in 0..200 {
            q.insert(h(i), ms(i), i);
        }
        for i in 0..150 {
            q.remove(h(i));
        }
        assert_eq!(q.len(), 50);
        // Compaction ran at least once, so the heap no longer holds every entry
        assert!(q.heap.len() < 200);
        let due = q.pop_due(ms(1_000));
        assert_eq!(due.len(), 50);
        assert_eq!(due.first(), Some(&h(150)));
    }
}
