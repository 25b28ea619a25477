/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core timer data structures.
//!
//! ```text
//! schedule_once / schedule_repeating ──► Timer (Pending)
//!                                          │  deadline <= now
//!                                          ▼
//!                                        Firing ──► Completed (one-shot, removed)
//!                                          │
//!                                          └──────► Pending   (repeating, re-armed)
//!
//! cancel() from any live state ──► Cancelled (removed, never fires again)
//! ```
//!
//! # Ownership model
//! A [`Timer`] is owned by the registry for its whole life.  While it fires,
//! its callback is moved out of the entry so the callback can receive a
//! mutable [`Timers`] context without aliasing the entry it lives in; the
//! callback is moved back only when the timer is re-armed.

use std::fmt;
use std::time::Duration;

use crate::timers::Timers;

// ── TimerHandle ───────────────────────────────────────────────────────────────

/// Opaque identifier returned by the scheduling calls.
///
/// Handles are allocated from a strictly increasing counter and are never
/// reused, so a stale handle can never alias a newer timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    /// Raw numeric id, for logging.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

// ── TimerState ────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting in the deadline queue.
    Pending,
    /// Its callback is executing right now.
    Firing,
    /// Cancelled through the cancellation gate; never dispatched again.
    Cancelled,
    /// One-shot timer whose callback has run.
    Completed,
}

// ── Callback type ─────────────────────────────────────────────────────────────

/// Work attached to a timer.
///
/// Invoked with the instant of the dispatch pass and a [`Timers`] context
/// through which the callback may schedule or cancel timers, including its
/// own (see [`Timers::current`]).
pub type TimerCallback = Box<dyn FnMut(Duration, &mut Timers)>;

// ── Timer ─────────────────────────────────────────────────────────────────────

/// The unit of scheduled work.
pub struct Timer {
    pub handle: TimerHandle,

    /// Absolute instant at which the timer becomes due.
    pub deadline: Duration,

    /// Repeat period.  `None` for one-shot timers.
    pub period: Option<Duration>,

    pub state: TimerState,

    /// Creation order; breaks ties between equal deadlines (FIFO).
    ///
    /// Repeating timers keep their creation sequence across re-arms.
    pub sequence: u64,

    /// `None` only while the callback is executing.
    pub(crate) callback: Option<TimerCallback>,
}

impl Timer {
    pub fn is_repeating(&self) -> bool {
        self.period.is_some()
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("handle", &self.handle)
            .field("deadline", &self.deadline)
            .field("period", &self.period)
            .field("state", &self.state)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

// ── Re-arm policy ─────────────────────────────────────────────────────────────

/// Next deadline of a repeating timer that was scheduled for `deadline` and
/// fired during the pass at `now`.
///
/// The deadline advances in whole periods from the *scheduled* deadline, not
/// from `now`, so callback latency never accumulates into drift.  When the
/// host stalled across several periods the missed firings are coalesced: the
/// result is the first multiple strictly after `now`, and the second value is
/// how many periods were skipped to get there.
///
/// `period` must be non-zero.
pub fn next_deadline_after(deadline: Duration, period: Duration, now: Duration) -> (Duration, u64) {
    debug_assert!(!period.is_zero(), "repeating timer with zero period");

    let period_ns = period.as_nanos().max(1);
    let behind_ns = now.saturating_sub(deadline).as_nanos();
    let steps = behind_ns / period_ns + 1;

    let next_ns = deadline.as_nanos().saturating_add(steps.saturating_mul(period_ns));
    let next = duration_from_nanos(next_ns);
    let skipped = u64::try_from(steps - 1).unwrap_or(u64::MAX);
    (next, skipped)
}

fn duration_from_nanos(ns: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(ns / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (ns % NANOS_PER_SEC) as u32)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
