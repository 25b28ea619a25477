/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for timer creation.
//!
//! Creating a timer is the only fallible operation in the scheduler.  Lookups
//! and cancellations against stale or unknown handles are *not* errors: a
//! cancellation racing with a natural completion is an expected condition and
//! degrades to a no-op.
//!
//! * [`ExhaustionReason`]: which resource ran out.
//! * [`TimerError`]: returned from
//!   [`Timers::schedule_once`](super::Timers::schedule_once) and
//!   [`Timers::schedule_repeating`](super::Timers::schedule_repeating).

use thiserror::Error;

// ── Exhaustion detail ─────────────────────────────────────────────────────────

/// Detailed reason why a timer could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustionReason {
    /// The registry already holds the configured maximum number of live
    /// timers.
    CapacityReached { limit: usize },

    /// The `u64` handle counter has been used up.  Handles are never reused,
    /// so no further timer can be created by this scheduler instance.
    HandleSpaceExhausted,
}

impl std::fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustionReason::CapacityReached { limit } => {
                write!(f, "timer capacity of {} live timers reached", limit)
            }
            ExhaustionReason::HandleSpaceExhausted => {
                write!(f, "timer handle space exhausted")
            }
        }
    }
}

// ── Top-level timer errors ────────────────────────────────────────────────────

/// Error returned when a timer cannot be created.
///
/// Fatal to the single scheduling request, never to the host: the caller may
/// retry later (capacity frees up as timers complete) or drop the request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot create timer: {0}")]
    ResourceExhausted(ExhaustionReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_limit() {
        let err = TimerError::ResourceExhausted(ExhaustionReason::CapacityReached { limit: 8 });
        assert_eq!(
            err.to_string(),
            "cannot create timer: timer capacity of 8 live timers reached"
        );
    }
}
