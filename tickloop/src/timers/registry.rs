/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Handle-keyed storage for live timers.

use std::collections::HashMap;
use std::time::Duration;

use super::error::{ExhaustionReason, TimerError};
use crate::timer::{Timer, TimerCallback, TimerHandle, TimerState};

/// Owns every live [`Timer`].
///
/// A timer stays here from creation until it completes or is cancelled.  The
/// deadline queue only stores handles; the registry is the source of truth
/// for a timer's state.
#[derive(Debug)]
pub struct TimerRegistry {
    timers: HashMap<TimerHandle, Timer>,

    /// Next id to hand out.  Doubles as the creation sequence.
    next_id: u64,

    /// Maximum number of live timers.
    capacity: usize,
}

impl TimerRegistry {
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Allocate a handle and store a new `Pending` timer.
    ///
    /// Never invokes `callback`.
    ///
    /// # Errors
    /// [`TimerError::ResourceExhausted`] when the capacity limit is reached or
    /// the handle counter has run out.
    pub fn create(
        &mut self,
        deadline: Duration,
        period: Option<Duration>,
        callback: TimerCallback,
    ) -> Result<&Timer, TimerError> {
        if self.timers.len() >= self.capacity {
            return Err(TimerError::ResourceExhausted(
                ExhaustionReason::CapacityReached {
                    limit: self.capacity,
                },
            ));
        }

        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or(TimerError::ResourceExhausted(
                ExhaustionReason::HandleSpaceExhausted,
            ))?;

        let handle = TimerHandle(id);
        let timer = Timer {
            handle,
            deadline,
            period,
            state: TimerState::Pending,
            sequence: id,
            callback: Some(callback),
        };

        Ok(self.timers.entry(handle).or_insert(timer))
    }

    pub fn lookup(&self, handle: TimerHandle) -> Option<&Timer> {
        self.timers.get(&handle)
    }

    pub fn lookup_mut(&mut self, handle: TimerHandle) -> Option<&mut Timer> {
        self.timers.get_mut(&handle)
    }

    /// Delete the entry for `handle`.  No-op if it is already gone.
    pub fn remove(&mut self, handle: TimerHandle) -> Option<Timer> {
        self.timers.remove(&handle)
    }

    /// Handles of every live timer, in creation order.
    pub fn handles(&self) -> Vec<TimerHandle> {
        let mut handles: Vec<TimerHandle> = self.timers.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn set_next_id(&mut self, id: u64) {
        self.next_id = id;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> TimerCallback {
        Box::new(|_, _| {})
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn create_assigns_increasing_handles_and_sequences() {
        let mut reg = TimerRegistry::with_capacity_limit(16);
        let a = reg.create(ms(10), None, noop()).unwrap().handle;
        let b = reg.create(ms(5), None, noop()).unwrap().handle;
        assert!(a < b);
        assert!(reg.lookup(a).unwrap().sequence < reg.lookup(b).unwrap().sequence);
    }

    #[test]
    fn new_timers_are_pending_with_their_callback() {
        let mut reg = TimerRegistry::with_capacity_limit(16);
        let t = reg.create(ms(10), Some(ms(10)), noop()).unwrap();
        assert_eq!(t.state, TimerState::Pending);
        assert!(t.is_repeating());
        assert!(t.callback.is_some());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = TimerRegistry::with_capacity_limit(16);
        let h = reg.create(ms(10), None, noop()).unwrap().handle;
        assert!(reg.remove(h).is_some());
        assert!(reg.remove(h).is_none());
        assert!(reg.lookup(h).is_none());
    }

    #[test]
    fn capacity_limit_is_enforced_and_freed_by_removal() {
        let mut reg = TimerRegistry::with_capacity_limit(2);
        let a = reg.create(ms(1), None, noop()).unwrap().handle;
        reg.create(ms(2), None, noop()).unwrap();

        let err = reg.create(ms(3), None, noop()).unwrap_err();
        assert_eq!(
            err,
            TimerError::ResourceExhausted(ExhaustionReason::CapacityReached { limit: 2 })
        );

        reg.remove(a);
        assert!(reg.create(ms(3), None, noop()).is_ok());
    }

    #[test]
    fn handle_space_exhaustion_is_reported() {
        let mut reg = TimerRegistry::with_capacity_limit(16);
        reg.set_next_id(u64::MAX);
        let err = reg.create(ms(1), None, noop()).unwrap_err();
        assert_eq!(
            err,
            TimerError::ResourceExhausted(ExhaustionReason::HandleSpaceExhausted)
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn handles_are_listed_in_creation_order() {
        let mut reg = TimerRegistry::with_capacity_limit(16);
        let hs: Vec<_> = (0..5)
            .map(|i| reg.create(ms(100 - i), None, noop()).unwrap().handle)
            .collect();
        assert_eq!(reg.handles(), hs);
    }
}
