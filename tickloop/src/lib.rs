/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! tickloop – deadline-ordered timer dispatch for frame-driven hosts
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── clock        – monotonic time sources (real and manual)
//! ├── timer        – timer handle, state and callback types
//! ├── timers/      – registry, deadline queue and cancellation gate
//! ├── scheduler/   – per-frame dispatch loop and frame statistics
//! └── config/      – YAML host configuration
//! ```

pub mod clock;
pub mod config;
pub mod scheduler;
pub mod timer;
pub mod timers;
