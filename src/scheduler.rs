// src/scheduler.rs
//! Frame scheduler: the fixed-cadence render loop.
//!
//! Between ticks the scheduler waits on the control channel, applying every
//! command as it arrives. When the tick deadline passes it renders one frame
//! from the current parameters and hands it to the sink. Deadlines advance by a
//! whole frame interval from the previous deadline, never from "now", so the
//! cadence does not accumulate drift.
//!
//! Rendering, parameter updates and draining all happen on the calling thread;
//! the only wait is inside `try_drain_until`.

use crate::config::Config;
use crate::control::{ChannelClosed, ColorUpdate, Command, ControlReceiver};
use crate::params::{ParamError, ParameterStore};
use crate::renderer::PlaidRenderer;
use crate::sink::{DisplaySink, SinkError};
use log::*;
use std::fmt;
use std::time::{Duration, Instant};

/// Why the render loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// A `Quit` command was drained.
    Quit,
    /// Every producer dropped its sender; no further commands can arrive.
    ControlClosed,
}

/// Terminal failures of the render loop.
#[derive(Debug)]
pub enum SchedulerError {
    Sink(SinkError),
    Params(ParamError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Sink(e) => write!(f, "frame delivery failed: {}", e),
            SchedulerError::Params(e) => write!(f, "parameter store incomplete: {}", e),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Sink(e) => Some(e),
            SchedulerError::Params(e) => Some(e),
        }
    }
}

impl From<SinkError> for SchedulerError {
    fn from(e: SinkError) -> Self {
        SchedulerError::Sink(e)
    }
}

impl From<ParamError> for SchedulerError {
    fn from(e: ParamError) -> Self {
        SchedulerError::Params(e)
    }
}

/// A frame rate that does not map to a usable frame interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidFrameRate(pub f64);

impl fmt::Display for InvalidFrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame rate {} fps does not give a frame interval between 1ns and {:?}",
            self.0, MAX_FRAME_INTERVAL
        )
    }
}

impl std::error::Error for InvalidFrameRate {}

/// Longest accepted frame interval (one frame a day).
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// `1 / fps` as a `Duration`, rejecting rates that round to a zero interval
/// or overflow past [`MAX_FRAME_INTERVAL`].
pub fn frame_interval(fps: f64) -> Result<Duration, InvalidFrameRate> {
    match Duration::try_from_secs_f64(1.0 / fps) {
        Ok(interval) if !interval.is_zero() && interval <= MAX_FRAME_INTERVAL => Ok(interval),
        _ => Err(InvalidFrameRate(fps)),
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames_sent: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    /// Ticks dropped after falling more than one interval behind.
    pub ticks_skipped: u64,
}

/// Strip size and cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub n_pixels: usize,
    pub frame_interval: Duration,
}

impl FrameTiming {
    pub fn new(n_pixels: usize, fps: f64) -> Result<Self, InvalidFrameRate> {
        Ok(Self {
            n_pixels,
            frame_interval: frame_interval(fps)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, InvalidFrameRate> {
        Self::new(config.render.pixel_count, config.render.fps)
    }
}

/// Drives the render loop. Exclusively owns the parameter store.
pub struct FrameScheduler<'a> {
    params: ParameterStore,
    renderer: PlaidRenderer,
    timing: FrameTiming,
    control: &'a ControlReceiver,
    sink: &'a mut dyn DisplaySink,
    stats: SchedulerStats,
}

impl<'a> FrameScheduler<'a> {
    /// Fails if the store is missing a channel the renderer reads.
    pub fn new(
        params: ParameterStore,
        renderer: PlaidRenderer,
        timing: FrameTiming,
        control: &'a ControlReceiver,
        sink: &'a mut dyn DisplaySink,
    ) -> Result<Self, ParamError> {
        params.plaid_params()?;
        Ok(Self {
            params,
            renderer,
            timing,
            control,
            sink,
            stats: SchedulerStats::default(),
        })
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Runs until `Quit`, control channel closure, or a sink failure.
    pub fn run(&mut self) -> Result<SchedulerExit, SchedulerError> {
        let interval = self.timing.frame_interval;
        let start = Instant::now();
        let mut next_tick = start + interval;
        info!(
            "FrameScheduler: started ({} px, interval {:?})",
            self.timing.n_pixels, interval
        );

        loop {
            let batch = match self.control.try_drain_until(next_tick) {
                Ok(batch) => batch,
                Err(ChannelClosed) => {
                    info!("FrameScheduler: control channel closed, stopping");
                    return Ok(SchedulerExit::ControlClosed);
                }
            };

            for command in batch {
                match command {
                    Command::ColorUpdate(update) => self.apply_update(&update),
                    Command::Quit => {
                        info!("FrameScheduler: Quit received, stopping");
                        return Ok(SchedulerExit::Quit);
                    }
                }
            }

            let now = Instant::now();
            if now < next_tick {
                continue;
            }

            self.render_tick(now.duration_since(start))?;
            next_tick += interval;
            self.skip_missed_ticks(&mut next_tick, interval);
        }
    }

    fn apply_update(&mut self, update: &ColorUpdate) {
        match self.params.apply(update) {
            Ok(()) => self.stats.commands_applied += 1,
            Err(e) => {
                warn!("FrameScheduler: rejected update: {}", e);
                self.stats.commands_rejected += 1;
            }
        }
    }

    fn render_tick(&mut self, elapsed: Duration) -> Result<(), SchedulerError> {
        let params = self.params.plaid_params()?;
        let frame = self
            .renderer
            .render_frame(self.timing.n_pixels, elapsed.as_secs_f64(), &params);
        self.sink.send_frame(&frame).map_err(|e| {
            error!("FrameScheduler: sink failed, stopping: {}", e);
            SchedulerError::Sink(e)
        })?;
        self.stats.frames_sent += 1;
        trace!(
            "FrameScheduler: frame {} at {:.3}s",
            self.stats.frames_sent,
            elapsed.as_secs_f64()
        );
        Ok(())
    }

    /// Keeps `next_tick` on the `start + k * interval` grid but jumps past any
    /// whole intervals already missed.
    fn skip_missed_ticks(&mut self, next_tick: &mut Instant, interval: Duration) {
        let now = Instant::now();
        if now < *next_tick + interval {
            return;
        }
        let behind = now.duration_since(*next_tick);
        let missed = (behind.as_nanos() / interval.as_nanos().max(1)).min(u32::MAX as u128) as u32;
        *next_tick += interval * missed;
        self.stats.ticks_skipped += missed as u64;
        debug!(
            "FrameScheduler: {:?} behind, skipped {} ticks",
            behind, missed
        );
    }
}
