/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use tickloop::clock::MonotonicClock;
use tickloop::config::{validate_frame_rate, FramePacing, HostConfig};
use tickloop::scheduler::{Frame, InputSnapshot, Scheduler};
use tickloop::timer::TimerCallback;
use tickloop::timers::{TimerError, Timers};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Demo host for the tickloop frame scheduler.
///
/// Example:
///   tickloop --scenario timeouts --duration-ms 2000 --config host.yaml
#[derive(Debug, Parser)]
#[command(
    name = "tickloop",
    about = "Frame-driven timer scheduler – demo host",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML host configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Demo scenario to install before the frame loop starts.
    #[arg(short = 's', long = "scenario", value_enum, default_value_t = Scenario::Interval)]
    scenario: Scenario,

    /// How long to run the frame loop, in milliseconds.
    #[arg(short = 'd', long = "duration-ms", default_value_t = 1_500)]
    duration_ms: u64,

    /// Override the configured frame rate (frames per second).
    #[arg(short = 'r', long = "frame-rate")]
    frame_rate: Option<f64>,

    /// Disable frame pacing and tick back-to-back.
    #[arg(short = 'u', long = "uncapped", default_value_t = false)]
    uncapped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// An interval every 100 ms, cleared by a timeout at 500 ms.
    Interval,
    /// Simultaneous timeouts, a self-rescheduling chain and a cleared timeout.
    Timeouts,
    /// A frame callback animating a rotation, with a periodic status timer.
    Spin,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("tickloop host starting up...");

    let cli = Cli::parse();

    info!(
        config      = ?cli.config,
        scenario    = ?cli.scenario,
        duration_ms = cli.duration_ms,
        frame_rate  = ?cli.frame_rate,
        uncapped    = cli.uncapped,
        "Configuration"
    );

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load host configuration: {:#}", e);
            process::exit(1);
        }
    };

    let mut scheduler = Scheduler::new(&config.scheduler, MonotonicClock::new());

    if let Err(e) = install_scenario(cli.scenario, &mut scheduler) {
        error!("Failed to install scenario: {:#}", e);
        process::exit(1);
    }

    run_frame_loop(&mut scheduler, config.pacing, Duration::from_millis(cli.duration_ms)).await;

    let report = scheduler.shutdown();
    info!(
        frames    = report.total_frames,
        fps       = %format!("{:.1}", report.fps),
        cancelled = report.cancelled,
        "tickloop host finished"
    );
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Load the file (or defaults) and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<HostConfig> {
    let mut config = match &cli.config {
        Some(path) => HostConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default host settings");
            HostConfig::default()
        }
    };

    if cli.uncapped {
        config.pacing = FramePacing::Uncapped;
    } else if let Some(fps) = cli.frame_rate {
        validate_frame_rate(fps).context("Invalid --frame-rate")?;
        config.pacing = FramePacing::Fixed(fps);
    }

    info!(pacing = ?config.pacing, "Host pacing");
    Ok(config)
}

// ── Frame loop ────────────────────────────────────────────────────────────────

/// Drive `scheduler` once per frame until `run_for` elapses or Ctrl-C.
///
/// The scheduler holds `!Send` callbacks, so it stays on the runtime's main
/// future for the whole loop.
async fn run_frame_loop(scheduler: &mut Scheduler, pacing: FramePacing, run_for: Duration) {
    let started = Instant::now();
    let mut ticker = pacing.frame_interval().map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while started.elapsed() < run_for {
        tokio::select! {
            _ = &mut ctrl_c => {
                warn!("Interrupted, stopping frame loop");
                break;
            }
            _ = next_frame(&mut ticker) => {}
        }

        scheduler.tick(simulated_pointer(started.elapsed()));
    }
}

async fn next_frame(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => tokio::task::yield_now().await,
    }
}

/// Pointer circling the centre of a 640×480 surface once every two seconds.
fn simulated_pointer(elapsed: Duration) -> InputSnapshot {
    let angle = elapsed.as_secs_f32() * std::f32::consts::PI;
    InputSnapshot::pointer(320.0 + 100.0 * angle.cos(), 240.0 + 100.0 * angle.sin())
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

fn install_scenario(scenario: Scenario, scheduler: &mut Scheduler) -> Result<()> {
    match scenario {
        Scenario::Interval => install_interval(scheduler),
        Scenario::Timeouts => install_timeouts(scheduler),
        Scenario::Spin => install_spin(scheduler),
    }
    .with_context(|| format!("scenario {scenario:?}"))
}

fn install_interval(scheduler: &mut Scheduler) -> Result<(), TimerError> {
    let created = scheduler.timers().now();

    let interval = scheduler.schedule_repeating(Duration::from_millis(100), move |now, _| {
        info!("Time passed: {}ms", now.saturating_sub(created).as_millis());
    })?;

    scheduler.schedule_once(Duration::from_millis(500), move |_, timers| {
        info!("Clearing interval...");
        timers.cancel(interval);
    })?;
    Ok(())
}

fn install_timeouts(scheduler: &mut Scheduler) -> Result<(), TimerError> {
    const BURST: u32 = 100;
    let created = scheduler.timers().now();
    let burst_deadline = created + Duration::from_millis(300);

    // Many timeouts sharing one deadline
    let landed = Rc::new(Cell::new(0u32));
    for _ in 0..BURST {
        let landed = landed.clone();
        scheduler.schedule_once(Duration::from_millis(300), move |now, _| {
            landed.set(landed.get() + 1);
            if landed.get() == BURST {
                info!(
                    count = BURST,
                    late_ms = now.saturating_sub(burst_deadline).as_millis() as u64,
                    "Burst of timeouts fired"
                );
            }
        })?;
    }

    // A timeout that keeps rescheduling itself
    scheduler.schedule_once(Duration::from_millis(100), chain_link(created, 1, 5))?;

    // Clearing a timer before it fires
    let doomed = scheduler.schedule_once(Duration::from_millis(900), |_, _| {
        error!("Error: we should not get here, the timeout was cleared");
    })?;
    scheduler.schedule_once(Duration::from_millis(1_100), |_, _| {
        info!("Fine, this one was not cleared");
    })?;
    scheduler.schedule_once(Duration::from_millis(500), move |_, timers| {
        info!("Clearing timer...");
        timers.cancel(doomed);
    })?;
    Ok(())
}

fn chain_link(scheduled_at: Duration, link: u32, links: u32) -> TimerCallback {
    Box::new(move |now: Duration, timers: &mut Timers| {
        info!(
            link,
            elapsed_ms = now.saturating_sub(scheduled_at).as_millis() as u64,
            "Chained timeout fired"
        );
        if link < links {
            if let Err(e) = timers.schedule_once(
                Duration::from_millis(100),
                chain_link(now, link + 1, links),
            ) {
                warn!("Chain stopped: {e}");
            }
        }
    })
}

#[derive(Debug, Default)]
struct SpinState {
    rotation_y: f32,
    rotation_z: f32,
    pointer: (f32, f32),
    frames: u64,
}

fn install_spin(scheduler: &mut Scheduler) -> Result<(), TimerError> {
    let state = Rc::new(RefCell::new(SpinState::default()));

    {
        let state = state.clone();
        scheduler.register_frame_callback(move |frame: &Frame, _: &mut Timers| {
            let mut s = state.borrow_mut();
            s.pointer = (frame.pointer_x, frame.pointer_y);
            s.rotation_y = (s.rotation_y + 0.6) % 360.0;
            s.rotation_z = (s.rotation_z + 0.8) % 360.0;
            s.frames = frame.index + 1;
        });
    }

    scheduler.schedule_repeating(Duration::from_secs(1), move |now, _| {
        let s = state.borrow();
        info!(
            elapsed_ms = now.as_millis() as u64,
            frames = s.frames,
            rotation_y = %format!("{:.1}", s.rotation_y),
            rotation_z = %format!("{:.1}", s.rotation_z),
            pointer = ?s.pointer,
            "Spin status"
        );
    })?;
    Ok(())
}
