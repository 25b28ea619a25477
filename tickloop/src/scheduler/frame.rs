/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-frame draw callback types and frame-rate accounting.

use std::time::Duration;

use crate::timers::Timers;

/// Input state supplied by the host with every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub pointer_x: f32,
    pub pointer_y: f32,
}

impl InputSnapshot {
    pub fn pointer(x: f32, y: f32) -> Self {
        Self {
            pointer_x: x,
            pointer_y: y,
        }
    }
}

/// Arguments handed to the frame callback once per dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Instant of this pass, measured from the clock origin.
    pub elapsed: Duration,
    pub pointer_x: f32,
    pub pointer_y: f32,
    /// Zero-based frame counter.
    pub index: u64,
}

/// Draw callback registered by the application.
///
/// Runs after every timer due in the same pass.  It may schedule or cancel
/// timers through the [`Timers`] context; new timers become due no earlier
/// than the next pass.
pub type FrameCallback = Box<dyn FnMut(&Frame, &mut Timers)>;

// ── FrameStats ────────────────────────────────────────────────────────────────

/// Frame counter with a windowed frames-per-second meter.
///
/// The rate is recomputed once per `window`, from the frames drawn since the
/// previous recomputation, so it reads as a steady value rather than a
/// per-frame jitter.
#[derive(Debug, Clone)]
pub struct FrameStats {
    total_frames: u64,
    window: Duration,
    window_start: Duration,
    window_frames: u64,
    fps: f64,
}

impl FrameStats {
    pub fn new(window: Duration) -> Self {
        Self {
            total_frames: 0,
            window,
            window_start: Duration::ZERO,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Count a frame drawn at `now`.  Returns `true` when the rate was
    /// recomputed.
    pub fn record(&mut self, now: Duration) -> bool {
        self.total_frames += 1;
        self.window_frames += 1;

        let elapsed = now.saturating_sub(self.window_start);
        if elapsed < self.window || elapsed.is_zero() {
            return false;
        }
        self.fps = self.window_frames as f64 / elapsed.as_secs_f64();
        self.window_frames = 0;
        self.window_start = now;
        true
    }

    /// Frames drawn since the scheduler was created.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Rate measured over the last completed window; `0.0` until the first
    /// window completes.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}
