// src/params.rs

//! Parameter store: the current oscillation parameters for every color channel.
//!
//! The set of channel names is fixed when the store is built. Updates can only
//! overwrite a registered channel; anything else is rejected so the renderer
//! never sees a half-initialized parameter set.

use crate::control::ColorUpdate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Channel names the renderer reads from the store.
pub const RED: &str = "red";
pub const GREEN: &str = "green";
pub const BLUE: &str = "blue";

/// Oscillation parameters for one color channel.
///
/// `speed` is the period (in seconds) of the temporal phase shift and must never
/// be zero; `freq` is the number of spatial cycles along the strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorParams {
    pub speed: f64,
    pub freq: f64,
}

impl ColorParams {
    pub const fn new(speed: f64, freq: f64) -> Self {
        Self { speed, freq }
    }

    /// Returns `true` if rendering with these parameters is well defined.
    pub fn is_valid(&self) -> bool {
        self.speed.is_finite() && self.speed != 0.0 && self.freq.is_finite()
    }
}

impl Default for ColorParams {
    fn default() -> Self {
        ColorParams::new(0.01, 0.01)
    }
}

/// Errors produced when reading from or writing to the [`ParameterStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The channel name was never registered.
    UnknownKey(String),
    /// The parameters would make the render undefined (zero or non-finite speed, non-finite freq).
    DegenerateParameter { name: String, speed: f64, freq: f64 },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::UnknownKey(name) => write!(f, "unknown channel '{}'", name),
            ParamError::DegenerateParameter { name, speed, freq } => write!(
                f,
                "degenerate parameters for channel '{}' (speed={}, freq={})",
                name, speed, freq
            ),
        }
    }
}

impl std::error::Error for ParamError {}

/// The three channel parameter sets the renderer consumes for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaidParams {
    pub red: ColorParams,
    pub green: ColorParams,
    pub blue: ColorParams,
}

impl PlaidParams {
    /// Same parameters on every channel.
    pub fn uniform(params: ColorParams) -> Self {
        Self {
            red: params,
            green: params,
            blue: params,
        }
    }
}

/// Single-owner map from channel name to its current [`ColorParams`].
#[derive(Debug, Clone)]
pub struct ParameterStore {
    params: HashMap<String, ColorParams>,
}

impl ParameterStore {
    /// Builds a store holding exactly the given channels.
    ///
    /// Every initial value must be valid; the store never holds a degenerate entry.
    pub fn new<I, S>(initial: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (S, ColorParams)>,
        S: Into<String>,
    {
        let mut params = HashMap::new();
        for (name, value) in initial {
            let name = name.into();
            if !value.is_valid() {
                return Err(ParamError::DegenerateParameter {
                    name,
                    speed: value.speed,
                    freq: value.freq,
                });
            }
            params.insert(name, value);
        }
        Ok(Self { params })
    }

    /// Store registering red, green and blue with the given defaults.
    pub fn with_plaid_defaults(defaults: PlaidParams) -> Result<Self, ParamError> {
        Self::new([
            (RED, defaults.red),
            (GREEN, defaults.green),
            (BLUE, defaults.blue),
        ])
    }

    pub fn get(&self, name: &str) -> Result<ColorParams, ParamError> {
        self.params
            .get(name)
            .copied()
            .ok_or_else(|| ParamError::UnknownKey(name.to_string()))
    }

    /// Overwrites the entry for a registered channel.
    ///
    /// On error the previous value is kept.
    pub fn apply(&mut self, update: &ColorUpdate) -> Result<(), ParamError> {
        let candidate = ColorParams::new(update.speed, update.freq);
        let slot = self
            .params
            .get_mut(&update.name)
            .ok_or_else(|| ParamError::UnknownKey(update.name.clone()))?;
        if !candidate.is_valid() {
            return Err(ParamError::DegenerateParameter {
                name: update.name.clone(),
                speed: update.speed,
                freq: update.freq,
            });
        }
        debug!(
            "ParameterStore: {} -> speed={} freq={}",
            update.name, candidate.speed, candidate.freq
        );
        *slot = candidate;
        Ok(())
    }

    /// Resolves the red, green and blue entries for a render.
    pub fn plaid_params(&self) -> Result<PlaidParams, ParamError> {
        Ok(PlaidParams {
            red: self.get(RED)?,
            green: self.get(GREEN)?,
            blue: self.get(BLUE)?,
        })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ParameterStore {
        ParameterStore::with_plaid_defaults(PlaidParams::uniform(ColorParams::new(1.0, 1.0)))
            .unwrap()
    }

    #[test]
    fn get_unknown_channel_fails() {
        let store = store();
        assert_eq!(
            store.get("magenta"),
            Err(ParamError::UnknownKey("magenta".to_string()))
        );
    }

    #[test]
    fn apply_overwrites_registered_channel() {
        let mut store = store();
        store.apply(&ColorUpdate::new(GREEN, 2.5, -0.5)).unwrap();
        assert_eq!(store.get(GREEN).unwrap(), ColorParams::new(2.5, -0.5));
        assert_eq!(store.get(RED).unwrap(), ColorParams::new(1.0, 1.0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn apply_rejects_unregistered_channel_without_inserting() {
        let mut store = store();
        let err = store.apply(&ColorUpdate::new("/red", 1.0, 1.0)).unwrap_err();
        assert_eq!(err, ParamError::UnknownKey("/red".to_string()));
        assert_eq!(store.len(), 3);
        assert!(store.get("/red").is_err());
    }

    #[test]
    fn apply_rejects_zero_speed_and_keeps_previous_value() {
        let mut store = store();
        let err = store.apply(&ColorUpdate::new(BLUE, 0.0, 3.0)).unwrap_err();
        assert!(matches!(err, ParamError::DegenerateParameter { .. }));
        assert_eq!(store.get(BLUE).unwrap(), ColorParams::new(1.0, 1.0));
    }

    #[test]
    fn apply_rejects_non_finite_values() {
        let mut store = store();
        assert!(store.apply(&ColorUpdate::new(RED, f64::NAN, 1.0)).is_err());
        assert!(store.apply(&ColorUpdate::new(RED, 1.0, f64::INFINITY)).is_err());
        assert_eq!(store.get(RED).unwrap(), ColorParams::new(1.0, 1.0));
    }

    #[test]
    fn new_rejects_degenerate_initial_value() {
        let result = ParameterStore::new([(RED, ColorParams::new(0.0, 1.0))]);
        assert!(matches!(
            result,
            Err(ParamError::DegenerateParameter { .. })
        ));
    }

    #[test]
    fn plaid_params_requires_all_three_channels() {
        let partial = ParameterStore::new([(RED, ColorParams::default())]).unwrap();
        assert_eq!(
            partial.plaid_params(),
            Err(ParamError::UnknownKey(GREEN.to_string()))
        );
        assert!(store().plaid_params().is_ok());
    }
}
