/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-frame dispatch loop.
//!
//! [`Scheduler`] is driven by the host once per rendered frame.  Each call to
//! [`tick`](Scheduler::tick) performs one dispatch pass:
//!
//! 1. read `now` from the clock (clamped so it never moves backward);
//! 2. snapshot every timer due at `now`, ordered by `(deadline, sequence)`;
//! 3. fire each snapshotted timer that is still `Pending`, then complete,
//!    re-arm or drop it;
//! 4. invoke the frame callback with `now` and the host's input snapshot;
//! 5. return a [`TickReport`].  The pass never sleeps or blocks.
//!
//! # Ordering guarantees
//!
//! | Situation | Guarantee |
//! |---|---|
//! | `a.deadline < b.deadline` | `a` fires first |
//! | equal deadlines | creation order |
//! | timers vs. frame callback | frame callback always last in the pass |
//! | timer created during a pass | fires in a later pass, whatever its delay |
//!
//! # Failure isolation
//! A panicking timer callback is caught at the dispatch boundary, logged, and
//! its timer is abandoned (never re-armed).  The remaining due timers and the
//! frame callback still run.  A panicking frame callback is unregistered.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use tickloop::clock::ManualClock;
//! use tickloop::config::SchedulerConfig;
//! use tickloop::scheduler::{InputSnapshot, Scheduler};
//!
//! let clock = ManualClock::new();
//! let mut scheduler = Scheduler::new(&SchedulerConfig::default(), clock.clone());
//!
//! let interval = scheduler
//!     .schedule_repeating(Duration::from_millis(100), |now, _| {
//!         println!("interval fired at {now:?}");
//!     })
//!     .unwrap();
//!
//! clock.set_ms(100);
//! let report = scheduler.tick(InputSnapshot::default());
//! assert_eq!(report.fired, 1);
//!
//! scheduler.cancel(interval);
//! assert_eq!(scheduler.pending_count(), 0);
//! ```

pub mod frame;

pub use frame::{Frame, FrameCallback, FrameStats, InputSnapshot};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::timer::TimerHandle;
use crate::timers::{Settled, TimerError, Timers};

// ── Reports ───────────────────────────────────────────────────────────────────

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Instant the pass ran at.
    pub now: Duration,

    /// Timer callbacks invoked (including ones that panicked).
    pub fired: usize,

    /// Periods skipped by repeating timers that were re-armed past `now`.
    pub coalesced: u64,

    /// Timer callbacks that panicked.
    pub failed: usize,

    /// Whether a frame callback ran to completion.
    pub frame_drawn: bool,
}

/// Summary returned by [`Scheduler::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShutdownReport {
    /// Live timers cancelled by the shutdown.
    pub cancelled: usize,

    /// Dispatch passes run over the scheduler's lifetime.
    pub total_frames: u64,

    /// Last measured frame rate.
    pub fps: f64,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Deadline-ordered callback dispatcher for a single-threaded host loop.
///
/// Created at host startup with [`new`](Self::new) and consumed by
/// [`shutdown`](Self::shutdown); there is no global instance.
pub struct Scheduler {
    timers: Timers,
    frame_callback: Option<FrameCallback>,
    frame_stats: FrameStats,
    last_pass: Option<Duration>,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig, clock: impl Clock + 'static) -> Self {
        info!(
            max_timers = config.max_timers,
            min_period_ms = config.min_period.as_millis() as u64,
            fps_window_ms = config.fps_window.as_millis() as u64,
            "scheduler initialised"
        );
        Self {
            timers: Timers::new(Box::new(clock), config),
            frame_callback: None,
            frame_stats: FrameStats::new(config.fps_window),
            last_pass: None,
        }
    }

    // ── Timer surface ─────────────────────────────────────────────────────────

    /// Scheduling context, for calls not mirrored on `Scheduler` itself.
    pub fn timers(&mut self) -> &mut Timers {
        &mut self.timers
    }

    /// See [`Timers::schedule_once`].
    pub fn schedule_once<F>(&mut self, delay: Duration, callback: F) -> Result<TimerHandle, TimerError>
    where
        F: FnMut(Duration, &mut Timers) + 'static,
    {
        self.timers.schedule_once(delay, callback)
    }

    /// See [`Timers::schedule_repeating`].
    pub fn schedule_repeating<F>(
        &mut self,
        delay: Duration,
        callback: F,
    ) -> Result<TimerHandle, TimerError>
    where
        F: FnMut(Duration, &mut Timers) + 'static,
    {
        self.timers.schedule_repeating(delay, callback)
    }

    /// See [`Timers::cancel`].
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.cancel(handle)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.pending_count()
    }

    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    // ── Frame surface ─────────────────────────────────────────────────────────

    /// Install the draw callback, replacing any previous one.
    pub fn register_frame_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Frame, &mut Timers) + 'static,
    {
        if self.frame_callback.is_some() {
            debug!("replacing existing frame callback");
        }
        self.frame_callback = Some(Box::new(callback));
        info!("frame callback set");
    }

    /// Remove the draw callback.  Returns `true` if one was registered.
    pub fn unregister_frame_callback(&mut self) -> bool {
        self.frame_callback.take().is_some()
    }

    pub fn has_frame_callback(&self) -> bool {
        self.frame_callback.is_some()
    }

    pub fn frame_stats(&self) -> &FrameStats {
        &self.frame_stats
    }

    // ── Dispatch loop ─────────────────────────────────────────────────────────

    /// Run one dispatch pass at the clock's current instant.
    pub fn tick(&mut self, input: InputSnapshot) -> TickReport {
        let now = self.timers.clock_now();
        self.tick_at(now, input)
    }

    /// Run one dispatch pass at a host-supplied instant.
    ///
    /// An instant earlier than the previous pass is clamped to it.
    pub fn tick_at(&mut self, now: Duration, input: InputSnapshot) -> TickReport {
        let now = self.clamp_monotonic(now);
        let due = self.timers.begin_pass(now);

        let mut report = TickReport {
            now,
            ..TickReport::default()
        };

        for handle in due {
            self.fire(handle, now, &mut report);
        }

        self.draw_frame(now, input, &mut report);
        report
    }

    fn clamp_monotonic(&mut self, now: Duration) -> Duration {
        let now = match self.last_pass {
            Some(last) if now < last => {
                warn!(
                    last_ms = last.as_millis() as u64,
                    now_ms = now.as_millis() as u64,
                    "clock moved backward, reusing previous instant"
                );
                last
            }
            _ => now,
        };
        self.last_pass = Some(now);
        now
    }

    fn fire(&mut self, handle: TimerHandle, now: Duration, report: &mut TickReport) {
        let Some(mut callback) = self.timers.take_for_firing(handle) else {
            debug!(handle = handle.as_u64(), "due timer no longer pending, skipped");
            return;
        };

        let timers = &mut self.timers;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(now, timers)));
        report.fired += 1;

        let failed = match outcome {
            Ok(()) => false,
            Err(payload) => {
                report.failed += 1;
                error!(
                    handle = handle.as_u64(),
                    panic = %panic_message(payload.as_ref()),
                    "timer callback panicked, timer abandoned"
                );
                true
            }
        };

        match self.timers.settle(handle, callback, now, failed) {
            Settled::Rearmed { next, skipped } => {
                if skipped > 0 {
                    debug!(
                        handle = handle.as_u64(),
                        skipped,
                        next_ms = next.as_millis() as u64,
                        "repeating timer fell behind, missed periods coalesced"
                    );
                    report.coalesced += skipped;
                }
            }
            Settled::Cancelled => {
                debug!(handle = handle.as_u64(), "timer cancelled during its own pass");
            }
            Settled::Completed | Settled::Abandoned => {}
        }
    }

    fn draw_frame(&mut self, now: Duration, input: InputSnapshot, report: &mut TickReport) {
        let frame = Frame {
            elapsed: now,
            pointer_x: input.pointer_x,
            pointer_y: input.pointer_y,
            index: self.frame_stats.total_frames(),
        };

        if let Some(mut callback) = self.frame_callback.take() {
            let timers = &mut self.timers;
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&frame, timers))) {
                Ok(()) => {
                    self.frame_callback = Some(callback);
                    report.frame_drawn = true;
                }
                Err(payload) => {
                    error!(
                        frame = frame.index,
                        panic = %panic_message(payload.as_ref()),
                        "frame callback panicked, callback unregistered"
                    );
                }
            }
        }

        if self.frame_stats.record(now) {
            debug!(
                fps = self.frame_stats.fps(),
                frames = self.frame_stats.total_frames(),
                pending = self.timers.pending_count(),
                "frame rate updated"
            );
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Cancel every pending timer, drop the frame callback and consume the
    /// scheduler.
    pub fn shutdown(mut self) -> ShutdownReport {
        let cancelled = self.timers.cancel_all();
        self.frame_callback = None;

        let report = ShutdownReport {
            cancelled,
            total_frames: self.frame_stats.total_frames(),
            fps: self.frame_stats.fps(),
        };
        info!(
            cancelled = report.cancelled,
            total_frames = report.total_frames,
            last_pass_ms = self.timers.pass_instant().as_millis() as u64,
            "scheduler shut down"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
