// src/config.rs

//! Configuration for the plaid render server.
//!
//! Every section carries `#[serde(default)]`, so a JSON file only needs the
//! fields it wants to override. The stripe constants were tuned by eye; they
//! are exposed here rather than hard-coded so they can be changed without a
//! rebuild.

use crate::params::{ColorParams, PlaidParams};
use crate::scheduler::frame_interval;
use crate::sink::opc;
use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "PLAID_CONFIG";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Strip size and cadence.
    pub render: RenderConfig,
    /// Black-stripe envelope constants.
    pub stripes: StripeConfig,
    /// Initial parameters for each color channel.
    pub channels: ChannelsConfig,
    /// Where frames are sent.
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of pixels in one frame.
    pub pixel_count: usize,
    /// Frames per second; the frame interval is `1 / fps`.
    pub fps: f64,
    /// Upper bound of each color channel before envelope multiplication.
    pub color_max: f64,
    /// Per-channel gain applied after the envelope.
    pub levels: ChannelLevels,
    /// Gain shared by all channels, applied with `levels`.
    pub brightness: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            pixel_count: 512,
            fps: 24.0,
            color_max: 255.0,
            levels: ChannelLevels::default(),
            brightness: 1.0,
        }
    }
}

/// Output gain per color channel. Scaled values are clamped to `[0, color_max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelLevels {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Default for ChannelLevels {
    fn default() -> Self {
        ChannelLevels {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
        }
    }
}

/// Constants of the black-stripe envelope.
///
/// The envelope is the sum of a spatial cosine over the jittered strip position
/// and a slow time-driven cosine, clamped to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StripeConfig {
    pub jitter_period: f64,
    /// Phase drift of the spatial stripes per second.
    pub drift_rate: f64,
    pub period: f64,
    pub min: f64,
    pub max: f64,
    pub offset_time_scale: f64,
    pub offset_phase: f64,
    pub offset_period: f64,
    pub offset_min: f64,
    pub offset_max: f64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        StripeConfig {
            jitter_period: 77.0,
            drift_rate: 0.05,
            period: 20.0,
            min: -1.0,
            max: 2.5,
            offset_time_scale: 1.0,
            offset_phase: -0.9,
            offset_period: 60.0,
            offset_min: -1.5,
            offset_max: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChannelsConfig {
    pub red: ColorParams,
    pub green: ColorParams,
    pub blue: ColorParams,
}

impl ChannelsConfig {
    pub fn plaid_params(&self) -> PlaidParams {
        PlaidParams {
            red: self.red,
            green: self.green,
            blue: self.blue,
        }
    }
}

/// Display sink selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Open Pixel Control server reachable over TCP.
    Opc {
        address: String,
        #[serde(default)]
        channel: u8,
    },
    /// Frames are accepted and discarded.
    Headless,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Opc {
            address: "127.0.0.1:7890".to_string(),
            channel: 0,
        }
    }
}

impl Config {
    /// Parses a JSON config file and validates it.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `PLAID_CONFIG`, or the defaults if it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Loading config from {:?}", path);
                Self::load_from_path(Path::new(&path))
            }
            None => {
                info!("{} not set, using default config", CONFIG_ENV_VAR);
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let render = &self.render;
        if render.pixel_count == 0 {
            bail!("render.pixel_count must be positive");
        }
        if let Err(e) = frame_interval(render.fps) {
            bail!("render.fps is unusable: {}", e);
        }
        if !(render.color_max.is_finite() && render.color_max > 0.0) {
            bail!(
                "render.color_max must be a positive number, got {}",
                render.color_max
            );
        }
        for (field, value) in [
            ("render.levels.red", render.levels.red),
            ("render.levels.green", render.levels.green),
            ("render.levels.blue", render.levels.blue),
            ("render.brightness", render.brightness),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                bail!("{} must be a non-negative number, got {}", field, value);
            }
        }
        if matches!(self.sink, SinkConfig::Opc { .. }) && render.pixel_count > opc::MAX_PIXELS {
            bail!(
                "render.pixel_count {} exceeds the OPC limit of {} pixels per message",
                render.pixel_count,
                opc::MAX_PIXELS
            );
        }

        let stripes = &self.stripes;
        for (field, value) in [
            ("stripes.jitter_period", stripes.jitter_period),
            ("stripes.period", stripes.period),
            ("stripes.offset_period", stripes.offset_period),
        ] {
            if !value.is_finite() || value == 0.0 {
                bail!("{} must be finite and non-zero, got {}", field, value);
            }
        }

        for (name, params) in [
            ("red", self.channels.red),
            ("green", self.channels.green),
            ("blue", self.channels.blue),
        ] {
            if !params.is_valid() {
                bail!(
                    "channels.{} has degenerate parameters (speed={}, freq={})",
                    name,
                    params.speed,
                    params.freq
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "render": { "fps": 60 }, "sink": { "kind": "headless" } }"#,
        )
        .unwrap();
        assert_eq!(config.render.fps, 60.0);
        assert_eq!(config.render.pixel_count, 512);
        assert_eq!(config.stripes, StripeConfig::default());
        assert_eq!(config.sink, SinkConfig::Headless);
    }

    #[test]
    fn opc_sink_channel_defaults_to_zero() {
        let sink: SinkConfig =
            serde_json::from_str(r#"{ "kind": "opc", "address": "10.0.0.2:7890" }"#).unwrap();
        assert_eq!(
            sink,
            SinkConfig::Opc {
                address: "10.0.0.2:7890".to_string(),
                channel: 0
            }
        );
    }

    #[test]
    fn channel_params_deserialize() {
        let config: Config = serde_json::from_str(
            r#"{ "channels": { "red": { "speed": -0.7, "freq": -1.7 } } }"#,
        )
        .unwrap();
        assert_eq!(config.channels.red, ColorParams::new(-0.7, -1.7));
        assert_eq!(config.channels.green, ColorParams::default());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.render.pixel_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.render.fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stripes.period = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.channels.blue = ColorParams::new(0.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_fps_without_usable_interval() {
        for fps in [1e-20, 1e-6, 1e10, -24.0, f64::INFINITY, f64::NAN] {
            let mut config = Config::default();
            config.render.fps = fps;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("render.fps"), "fps {}: {}", fps, err);
        }
        let mut config = Config::default();
        config.render.fps = 1000.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_strip_too_long_for_opc() {
        let mut config = Config::default();
        config.render.pixel_count = opc::MAX_PIXELS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPC limit"));

        config.render.pixel_count = opc::MAX_PIXELS;
        assert!(config.validate().is_ok());

        config.render.pixel_count = opc::MAX_PIXELS + 1;
        config.sink = SinkConfig::Headless;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn levels_and_brightness_default_to_unity() {
        let config: Config = serde_json::from_str(
            r#"{ "render": { "levels": { "blue": 0.5 }, "brightness": 0.8 } }"#,
        )
        .unwrap();
        assert_eq!(config.render.levels.red, 1.0);
        assert_eq!(config.render.levels.blue, 0.5);
        assert_eq!(config.render.brightness, 0.8);
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.render.levels.green = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_missing_path_fails_with_context() {
        let err = Config::load_from_path(Path::new("/nonexistent/plaid.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
