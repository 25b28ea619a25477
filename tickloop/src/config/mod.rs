/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Host configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! host:
//!   frame_rate: 60
//!   uncapped: false
//! scheduler:
//!   max_timers: 65536
//!   min_period_ms: 1
//!   fps_window_ms: 1000
//! ```
//!
//! Every section and every field is optional.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_FRAME_RATE: f64 = 60.0;
pub const DEFAULT_MAX_TIMERS: usize = 65_536;
pub const DEFAULT_MIN_PERIOD_MS: u64 = 1;
pub const DEFAULT_FPS_WINDOW_MS: u64 = 1_000;

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    host: HostSection,
    #[serde(default)]
    scheduler: SchedulerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostSection {
    frame_rate: Option<f64>,
    #[serde(default)]
    uncapped: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchedulerSection {
    max_timers: Option<usize>,
    min_period_ms: Option<u64>,
    fps_window_ms: Option<u64>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Limits and tuning for a [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Maximum number of live timers; creation beyond it fails with
    /// `ResourceExhausted`.
    pub max_timers: usize,

    /// Smallest period a repeating timer may have.
    pub min_period: Duration,

    /// Window over which the frames-per-second meter is averaged.
    pub fps_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_timers: DEFAULT_MAX_TIMERS,
            min_period: Duration::from_millis(DEFAULT_MIN_PERIOD_MS),
            fps_window: Duration::from_millis(DEFAULT_FPS_WINDOW_MS),
        }
    }
}

/// How the host paces its frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramePacing {
    /// Tick at a fixed rate (frames per second).
    Fixed(f64),
    /// Tick back-to-back with no frame-rate limit.
    Uncapped,
}

impl FramePacing {
    /// Interval between frames, `None` when uncapped.
    ///
    /// A rate that fails [`validate_frame_rate`] saturates to
    /// [`Duration::MAX`].
    pub fn frame_interval(&self) -> Option<Duration> {
        match self {
            FramePacing::Fixed(fps) => {
                Some(Duration::try_from_secs_f64(1.0 / fps).unwrap_or(Duration::MAX))
            }
            FramePacing::Uncapped => None,
        }
    }
}

/// Complete host configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub pacing: FramePacing,
    pub scheduler: SchedulerConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            pacing: FramePacing::Fixed(DEFAULT_FRAME_RATE),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl HostConfig {
    /// Parse and validate the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// carries out-of-range values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading host configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML")?
        };

        let pacing = if file.host.uncapped {
            FramePacing::Uncapped
        } else {
            let fps = file.host.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
            validate_frame_rate(fps)?;
            FramePacing::Fixed(fps)
        };

        let min_period_ms = file.scheduler.min_period_ms.unwrap_or(DEFAULT_MIN_PERIOD_MS);
        if min_period_ms == 0 {
            bail!("scheduler.min_period_ms must be at least 1");
        }
        let max_timers = file.scheduler.max_timers.unwrap_or(DEFAULT_MAX_TIMERS);
        if max_timers == 0 {
            bail!("scheduler.max_timers must be at least 1");
        }
        let fps_window_ms = file.scheduler.fps_window_ms.unwrap_or(DEFAULT_FPS_WINDOW_MS);
        if fps_window_ms == 0 {
            bail!("scheduler.fps_window_ms must be at least 1");
        }

        let config = HostConfig {
            pacing,
            scheduler: SchedulerConfig {
                max_timers,
                min_period: Duration::from_millis(min_period_ms),
                fps_window: Duration::from_millis(fps_window_ms),
            },
        };

        debug!(?config, "host configuration parsed");
        Ok(config)
    }
}

/// A frame rate must be a finite, strictly positive number whose frame
/// interval fits in a [`Duration`].
pub fn validate_frame_rate(fps: f64) -> Result<()> {
    if !fps.is_finite() || fps <= 0.0 {
        bail!("frame rate must be a positive number of frames per second, got {fps}");
    }
    if Duration::try_from_secs_f64(1.0 / fps).is_err() {
        bail!("frame rate {fps} is too low, its frame interval cannot be represented");
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
host:
  frame_rate: 30
scheduler:
  max_timers: 128
  min_period_ms: 4
  fps_window_ms: 500
"#;
        let f = yaml_tempfile(yaml);
        let cfg = HostConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.pacing, FramePacing::Fixed(30.0));
        assert_eq!(cfg.scheduler.max_timers, 128);
        assert_eq!(cfg.scheduler.min_period, Duration::from_millis(4));
        assert_eq!(cfg.scheduler.fps_window, Duration::from_millis(500));
    }

    #[test]
    fn optional_fields_use_defaults_when_absent() {
        let f = yaml_tempfile("host:\n  frame_rate: 120\n");
        let cfg = HostConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg.pacing, FramePacing::Fixed(120.0));
        assert_eq!(cfg.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn empty_file_is_the_default_config() {
        let f = yaml_tempfile("");
        let cfg = HostConfig::load_from_file(f.path()).unwrap();
        assert_eq!(cfg, HostConfig::default());
    }

    #[test]
    fn uncapped_overrides_frame_rate() {
        let cfg = HostConfig::from_yaml_str("host:\n  frame_rate: 30\n  uncapped: true\n").unwrap();
        assert_eq!(cfg.pacing, FramePacing::Uncapped);
        assert_eq!(cfg.pacing.frame_interval(), None);
    }

    #[test]
    fn frame_interval_is_reciprocal_of_rate() {
        let interval = FramePacing::Fixed(4.0).frame_interval().unwrap();
        assert_eq!(interval, Duration::from_millis(250));
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let err = HostConfig::from_yaml_str("host:\n  frame_rate: 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("frame rate"));
    }

    #[test]
    fn tiny_frame_rate_is_rejected() {
        let err = HostConfig::from_yaml_str("host:\n  frame_rate: 1.0e-30\n").unwrap_err();
        assert!(format!("{err:#}").contains("too low"));
        assert!(validate_frame_rate(1.0e-30).is_err());
        assert!(validate_frame_rate(0.001).is_ok());
    }

    #[test]
    fn unvalidated_tiny_rate_saturates_instead_of_panicking() {
        let interval = FramePacing::Fixed(1.0e-30).frame_interval();
        assert_eq!(interval, Some(Duration::MAX));
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(HostConfig::from_yaml_str("scheduler:\n  max_timers: 0\n").is_err());
        assert!(HostConfig::from_yaml_str("scheduler:\n  min_period_ms: 0\n").is_err());
        assert!(HostConfig::from_yaml_str("scheduler:\n  fps_window_ms: 0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(HostConfig::from_yaml_str("host:\n  framerate: 30\n").is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = HostConfig::load_from_file(Path::new("/nonexistent/path/host.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(HostConfig::load_from_file(f.path()).is_err());
    }
}
