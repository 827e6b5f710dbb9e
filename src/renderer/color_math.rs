// src/renderer/color_math.rs

//! Scalar helpers shared by the plaid renderer.

use std::f64::consts::TAU;

/// Linearly maps `x` from `[old_min, old_max]` onto `[new_min, new_max]`.
pub fn remap(x: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    let unit = (x - old_min) / (old_max - old_min);
    unit * (new_max - new_min) + new_min
}

/// Restricts `x` to `[lo, hi]`. Unlike `f64::clamp` this never panics.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

/// Cosine wave with the given period and phase offset, scaled to `[min, max]`.
///
/// Returns `max` whenever `x / period - offset` is an integer.
pub fn cos_wave(x: f64, offset: f64, period: f64, min: f64, max: f64) -> f64 {
    let unit = ((x / period - offset) * TAU).cos() / 2.0 + 0.5;
    unit * (max - min) + min
}
