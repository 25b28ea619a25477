/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time sources.
//!
//! Every instant handed out by a [`Clock`] is a [`Duration`] measured from
//! the clock's own origin.  The scheduler never needs calendar time, only
//! elapsed time and due-ness, so a relative value is all it consumes.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::warn;

/// A monotonic instant source supplied by the host.
///
/// Implementations must never return a value smaller than one they returned
/// before.
pub trait Clock {
    /// Current instant, relative to the clock's origin.
    fn now(&self) -> Duration;
}

// ── MonotonicClock ────────────────────────────────────────────────────────────

/// Wall-time clock backed by [`std::time::Instant`].
///
/// The origin is the moment the clock was created, so the first frame of a
/// host reports an elapsed time close to zero.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// Explicitly advanced clock.
///
/// Clones share the same underlying instant, so a test (or a host that
/// timestamps its own frames) can keep one handle while the scheduler owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Create a clock that starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get().saturating_add(delta));
    }

    /// Jump to an absolute instant.
    ///
    /// Moving backward is refused: the current instant is kept and a warning
    /// is logged.
    pub fn set(&self, instant: Duration) {
        let current = self.now.get();
        if instant < current {
            warn!(
                current_ms = current.as_millis() as u64,
                requested_ms = instant.as_millis() as u64,
                "ManualClock refused to move backward"
            );
            return;
        }
        self.now.set(instant);
    }

    /// Convenience for tests written in milliseconds.
    pub fn set_ms(&self, ms: u64) {
        self.set(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_starts_at_zero() {
        assert_eq!(ManualClock::new().now(), Duration::ZERO);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.advance(Duration::from_millis(40));
        assert_eq!(b.now(), Duration::from_millis(40));
        b.set_ms(100);
        assert_eq!(a.now(), Duration::from_millis(100));
    }

    #[test]
    fn manual_clock_never_moves_backward() {
        let clock = ManualClock::new();
        clock.set_ms(500);
        clock.set_ms(200);
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn monotonic_clock_is_non_decreasing() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
