// src/renderer.rs

//! This module defines the `PlaidRenderer`.
//!
//! The renderer turns the current channel parameters and the elapsed time into
//! one [`Frame`]. Three cosine waves (red, green, blue) with independent phase
//! speeds and spatial frequencies drift in and out of phase, giving a shifting
//! plaid. A shared black-stripe envelope darkens all three channels together so
//! diagonal dark bands sweep across the strip over time.
//!
//! Rendering is a pure function of its inputs: no clock reads and no I/O. The
//! same `(n_pixels, elapsed, params)` always produces the same frame.

pub mod color_math;

use crate::config::{ChannelLevels, Config, StripeConfig};
use crate::frame::{Frame, Rgb};
use crate::params::{ColorParams, PlaidParams};
use color_math::{clamp, cos_wave, remap};
use std::f64::consts::TAU;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaidRenderer {
    stripes: StripeConfig,
    color_max: f64,
    levels: ChannelLevels,
    brightness: f64,
}

impl PlaidRenderer {
    pub fn new(stripes: StripeConfig, color_max: f64) -> Self {
        Self {
            stripes,
            color_max,
            levels: ChannelLevels::default(),
            brightness: 1.0,
        }
    }

    /// Scales each channel by its level and the shared brightness.
    pub fn with_gain(mut self, levels: ChannelLevels, brightness: f64) -> Self {
        self.levels = levels;
        self.brightness = brightness;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.stripes.clone(), config.render.color_max)
            .with_gain(config.render.levels, config.render.brightness)
    }

    pub fn color_max(&self) -> f64 {
        self.color_max
    }

    /// Renders `n_pixels` pixels at `elapsed` seconds since the loop started.
    ///
    /// Every `speed` in `params` must be non-zero; the parameter store rejects
    /// updates that would violate this.
    pub fn render_frame(&self, n_pixels: usize, elapsed: f64, params: &PlaidParams) -> Frame {
        debug_assert!(
            params.red.is_valid() && params.green.is_valid() && params.blue.is_valid(),
            "render_frame called with degenerate params: {:?}",
            params
        );

        let pixels = (0..n_pixels)
            .map(|i| {
                let pct = i as f64 / n_pixels as f64;
                let envelope = self.stripe_envelope(pct, elapsed);
                let shade = |channel: ColorParams, level: f64| {
                    self.gain(envelope * self.channel_value(channel, pct, elapsed), level)
                };
                Rgb::new(
                    shade(params.red, self.levels.red),
                    shade(params.green, self.levels.green),
                    shade(params.blue, self.levels.blue),
                )
            })
            .collect();

        Frame::from_pixels(pixels)
    }

    /// Brightness multiplier in `[0, 1]` shared by all channels at position `pct`.
    pub fn stripe_envelope(&self, pct: f64, elapsed: f64) -> f64 {
        let s = &self.stripes;
        let jittered = (pct * s.jitter_period) % s.jitter_period;
        let stripes = cos_wave(jittered, elapsed * s.drift_rate, s.period, s.min, s.max);
        let offset = cos_wave(
            elapsed * s.offset_time_scale,
            s.offset_phase,
            s.offset_period,
            s.offset_min,
            s.offset_max,
        );
        clamp(stripes + offset, 0.0, 1.0)
    }

    /// One channel's value before the envelope, in `[0, color_max]`.
    pub fn channel_value(&self, params: ColorParams, pct: f64, elapsed: f64) -> f64 {
        let phase = elapsed / params.speed + pct * params.freq;
        remap((phase * TAU).cos(), -1.0, 1.0, 0.0, self.color_max)
    }

    fn gain(&self, value: f64, level: f64) -> f64 {
        clamp(value * level * self.brightness, 0.0, self.color_max)
    }
}

impl Default for PlaidRenderer {
    fn default() -> Self {
        Self::new(StripeConfig::default(), 255.0)
    }
}
