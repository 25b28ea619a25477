/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timer bookkeeping: registry, deadline queue and the cancellation gate.
//!
//! [`Timers`] is the only surface through which application code touches
//! scheduler state.  The host gets it from
//! [`Scheduler::timers`](crate::scheduler::Scheduler::timers); callbacks get
//! it as their second argument while they fire.  Either way the calls are
//! the same and none of them can observe or disturb a dispatch pass that is
//! already underway:
//!
//! * a timer created during a pass is inserted for a *later* pass, because the
//!   pass works on a snapshot taken before the first callback ran;
//! * a cancellation only flips state; the pass checks state before every
//!   invocation and before re-arming.
//!
//! # Cancellation semantics
//!
//! | State when `cancel` is called | Effect |
//! |---|---|
//! | `Pending` | removed from registry, tombstoned in the queue |
//! | `Firing` | marked `Cancelled`; the running invocation completes, re-arm is skipped |
//! | gone / unknown | no-op |
//!
//! A `Pending` timer that is already in the current pass's due snapshot is
//! treated like any other `Pending` timer: when a sibling cancels it, its turn
//! in the pass is skipped, so it never runs after `cancel` returns.

pub mod error;
pub mod queue;
pub mod registry;

pub use error::{ExhaustionReason, TimerError};

use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::timer::{next_deadline_after, TimerCallback, TimerHandle, TimerState};

use queue::DeadlineQueue;
use registry::TimerRegistry;

/// How a fired timer was settled once its callback returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
    /// One-shot timer ran and was removed.
    Completed,
    /// Repeating timer re-inserted at `next`; `skipped` periods coalesced.
    Rearmed { next: Duration, skipped: u64 },
    /// Cancelled while its callback was running.
    Cancelled,
    /// Callback failed; the timer was dropped without re-arming.
    Abandoned,
}

/// Scheduling context shared by the host and by callbacks.
pub struct Timers {
    registry: TimerRegistry,
    queue: DeadlineQueue,
    clock: Box<dyn Clock>,

    /// Instant of the most recent dispatch pass.  [`now`](Self::now) never
    /// reports anything earlier.
    pass_instant: Duration,

    /// Smallest period a repeating timer may have.
    min_period: Duration,

    /// Handle of the timer whose callback is executing.
    current: Option<TimerHandle>,
}

impl Timers {
    pub(crate) fn new(clock: Box<dyn Clock>, config: &SchedulerConfig) -> Self {
        Self {
            registry: TimerRegistry::with_capacity_limit(config.max_timers),
            queue: DeadlineQueue::new(),
            clock,
            pass_instant: Duration::ZERO,
            min_period: config.min_period,
            current: None,
        }
    }

    // ── Scheduling ────────────────────────────────────────────────────────────

    /// Run `callback` once, at the first dispatch pass at or after
    /// `now() + delay`.
    ///
    /// Returns immediately; the callback is never invoked synchronously, even
    /// with a zero delay.
    ///
    /// # Errors
    /// [`TimerError::ResourceExhausted`] if no more timers can be allocated.
    pub fn schedule_once<F>(&mut self, delay: Duration, callback: F) -> Result<TimerHandle, TimerError>
    where
        F: FnMut(Duration, &mut Timers) + 'static,
    {
        let deadline = self.now().saturating_add(delay);
        self.create(deadline, None, Box::new(callback))
    }

    /// Run `callback` every `delay`, first at `now() + delay`.
    ///
    /// Subsequent deadlines advance in whole periods from the previous
    /// *scheduled* deadline.  If the host stalls across several periods the
    /// timer fires once on resume and skips ahead (coalescing) rather than
    /// bursting.  A `delay` below the configured minimum period is raised to
    /// it.
    ///
    /// # Errors
    /// [`TimerError::ResourceExhausted`] if no more timers can be allocated.
    pub fn schedule_repeating<F>(
        &mut self,
        delay: Duration,
        callback: F,
    ) -> Result<TimerHandle, TimerError>
    where
        F: FnMut(Duration, &mut Timers) + 'static,
    {
        let period = if delay < self.min_period {
            debug!(
                requested_us = delay.as_micros() as u64,
                min_period_us = self.min_period.as_micros() as u64,
                "repeating delay raised to minimum period"
            );
            self.min_period
        } else {
            delay
        };
        let deadline = self.now().saturating_add(period);
        self.create(deadline, Some(period), Box::new(callback))
    }

    fn create(
        &mut self,
        deadline: Duration,
        period: Option<Duration>,
        callback: TimerCallback,
    ) -> Result<TimerHandle, TimerError> {
        let timer = self.registry.create(deadline, period, callback)?;
        let (handle, sequence) = (timer.handle, timer.sequence);
        self.queue.insert(handle, deadline, sequence);

        debug!(
            handle = handle.as_u64(),
            deadline_ms = deadline.as_millis() as u64,
            period_ms = ?period.map(|p| p.as_millis() as u64),
            "timer created"
        );
        Ok(handle)
    }

    // ── Cancellation gate ─────────────────────────────────────────────────────

    /// Stop `handle` from ever firing again.
    ///
    /// Safe from anywhere, including the timer's own callback.  Returns
    /// `true` if a live timer was affected; stale and unknown handles are a
    /// silent no-op returning `false`.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(timer) = self.registry.lookup_mut(handle) else {
            debug!(handle = handle.as_u64(), "cancel ignored: no live timer");
            return false;
        };

        match timer.state {
            TimerState::Pending => {
                timer.state = TimerState::Cancelled;
                self.registry.remove(handle);
                self.queue.remove(handle);
                debug!(handle = handle.as_u64(), "pending timer cancelled");
                true
            }
            TimerState::Firing => {
                timer.state = TimerState::Cancelled;
                debug!(handle = handle.as_u64(), "firing timer cancelled, re-arm suppressed");
                true
            }
            TimerState::Cancelled | TimerState::Completed => false,
        }
    }

    /// Cancel every live timer.  Returns how many were affected.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self
            .registry
            .handles()
            .into_iter()
            .filter(|&h| self.cancel(h))
            .count();
        self.queue.clear();
        cancelled
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Current instant: the clock's reading, never earlier than the instant
    /// of the latest dispatch pass.
    pub fn now(&self) -> Duration {
        self.clock.now().max(self.pass_instant)
    }

    /// Handle of the timer whose callback is running, if any.
    pub fn current(&self) -> Option<TimerHandle> {
        self.current
    }

    /// State of a live timer, `None` once it has completed or been cancelled.
    pub fn state(&self, handle: TimerHandle) -> Option<TimerState> {
        self.registry.lookup(handle).map(|t| t.state)
    }

    /// Scheduled deadline of a live timer.
    pub fn deadline(&self, handle: TimerHandle) -> Option<Duration> {
        self.registry.lookup(handle).map(|t| t.deadline)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.state(handle) == Some(TimerState::Pending)
    }

    /// Number of live timers (pending or firing).
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Earliest deadline among pending timers.
    ///
    /// A host that idles between frames can sleep until this instant.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.queue.next_deadline()
    }

    // ── Dispatch support (crate-internal) ─────────────────────────────────────

    pub(crate) fn clock_now(&self) -> Duration {
        self.clock.now()
    }

    pub(crate) fn pass_instant(&self) -> Duration {
        self.pass_instant
    }

    pub(crate) fn begin_pass(&mut self, now: Duration) -> Vec<TimerHandle> {
        self.pass_instant = now;
        self.queue.pop_due(now)
    }

    /// Move a due timer to `Firing` and hand out its callback.
    ///
    /// Returns `None` when the timer is no longer `Pending` (it was cancelled
    /// or removed after the snapshot was taken).
    pub(crate) fn take_for_firing(&mut self, handle: TimerHandle) -> Option<TimerCallback> {
        let timer = self.registry.lookup_mut(handle)?;
        if timer.state != TimerState::Pending {
            return None;
        }
        let callback = timer.callback.take()?;
        timer.state = TimerState::Firing;
        self.current = Some(handle);
        Some(callback)
    }

    /// Finish bookkeeping for a timer whose callback has returned (or failed).
    pub(crate) fn settle(
        &mut self,
        handle: TimerHandle,
        callback: TimerCallback,
        now: Duration,
        failed: bool,
    ) -> Settled {
        self.current = None;

        let Some(timer) = self.registry.lookup_mut(handle) else {
            return Settled::Cancelled;
        };

        if timer.state == TimerState::Cancelled {
            self.registry.remove(handle);
            return Settled::Cancelled;
        }
        if failed {
            timer.state = TimerState::Cancelled;
            self.registry.remove(handle);
            return Settled::Abandoned;
        }

        match timer.period {
            None => {
                timer.state = TimerState::Completed;
                self.registry.remove(handle);
                Settled::Completed
            }
            Some(period) => {
                let (next, skipped) = next_deadline_after(timer.deadline, period, now);
                timer.deadline = next;
                timer.state = TimerState::Pending;
                timer.callback = Some(callback);
                let sequence = timer.sequence;
                self.queue.insert(handle, next, sequence);
                Settled::Rearmed { next, skipped }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn queued_len(&self) -> usize {
        self.queue.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn timers_with(clock: &ManualClock, config: SchedulerConfig) -> Timers {
        Timers::new(Box::new(clock.clone()), &config)
    }

    fn timers(clock: &ManualClock) -> Timers {
        timers_with(clock, SchedulerConfig::default())
    }

    // ── schedule_* ────────────────────────────────────────────────────────────

    #[test]
    fn deadline_is_relative_to_the_clock() {
        let clock = ManualClock::new();
        clock.set_ms(250);
        let mut t = timers(&clock);
        let h = t.schedule_once(ms(100), |_, _| {}).unwrap();
        assert_eq!(t.deadline(h), Some(ms(350)));
        assert!(t.is_pending(h));
    }

    #[test]
    fn repeating_first_deadline_is_one_period_away() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        let h = t.schedule_repeating(ms(100), |_, _| {}).unwrap();
        assert_eq!(t.deadline(h), Some(ms(100)));
    }

    #[test]
    fn zero_repeating_delay_is_raised_to_min_period() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        let h = t.schedule_repeating(Duration::ZERO, |_, _| {}).unwrap();
        assert_eq!(t.deadline(h), Some(SchedulerConfig::default().min_period));
    }

    #[test]
    fn capacity_limit_surfaces_resource_exhausted() {
        let clock = ManualClock::new();
        let config = SchedulerConfig {
            max_timers: 1,
            ..SchedulerConfig::default()
        };
        let mut t = timers_with(&clock, config);
        t.schedule_once(ms(1), |_, _| {}).unwrap();
        assert_eq!(
            t.schedule_once(ms(1), |_, _| {}),
            Err(TimerError::ResourceExhausted(
                ExhaustionReason::CapacityReached { limit: 1 }
            ))
        );
    }

    // ── cancel ────────────────────────────────────────────────────────────────

    #[test]
    fn cancel_pending_removes_from_registry_and_queue() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        let h = t.schedule_once(ms(10), |_, _| {}).unwrap();
        assert!(t.cancel(h));
        assert_eq!(t.state(h), None);
        assert_eq!(t.pending_count(), 0);
        assert_eq!(t.queued_len(), 0);
    }

    #[test]
    fn cancel_twice_is_a_noop() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        let h = t.schedule_once(ms(10), |_, _| {}).unwrap();
        assert!(t.cancel(h));
        assert!(!t.cancel(h));
    }

    #[test]
    fn cancel_unknown_handle_is_a_noop() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        assert!(!t.cancel(TimerHandle(999)));
    }

    #[test]
    fn cancel_all_empties_everything() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        for i in 1..=5 {
            t.schedule_once(ms(i * 10), |_, _| {}).unwrap();
        }
        t.schedule_repeating(ms(7), |_, _| {}).unwrap();
        assert_eq!(t.cancel_all(), 6);
        assert_eq!(t.pending_count(), 0);
        assert_eq!(t.next_deadline(), None);
    }

    // ── queries ───────────────────────────────────────────────────────────────

    #[test]
    fn next_deadline_tracks_the_earliest_pending_timer() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        let early = t.schedule_once(ms(50), |_, _| {}).unwrap();
        t.schedule_once(ms(80), |_, _| {}).unwrap();
        assert_eq!(t.next_deadline(), Some(ms(50)));
        t.cancel(early);
        assert_eq!(t.next_deadline(), Some(ms(80)));
    }

    #[test]
    fn now_never_precedes_the_last_pass() {
        let clock = ManualClock::new();
        let mut t = timers(&clock);
        t.begin_pass(ms(300));
        assert_eq!(t.now(), ms(300));
        clock.set_ms(400);
        assert_eq!(t.now(), ms(400));
    }
}
