// src/frame.rs

//! One rendered frame: an ordered run of floating-point color triples.

/// A single pixel, each channel in `[0, color_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Channel values truncated into a byte, saturating at 0 and 255.
    pub fn to_bytes(self) -> [u8; 3] {
        [to_byte(self.r), to_byte(self.g), to_byte(self.b)]
    }
}

fn to_byte(value: f64) -> u8 {
    // `as` saturates and maps NaN to 0.
    value.clamp(0.0, 255.0) as u8
}

/// Pixels in strip order, index 0 first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pixels: Vec<Rgb>,
}

impl Frame {
    pub fn from_pixels(pixels: Vec<Rgb>) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Appends `3 * len()` bytes (r, g, b per pixel) to `out`.
    pub fn write_rgb_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.pixels.len() * 3);
        for pixel in &self.pixels {
            out.extend_from_slice(&pixel.to_bytes());
        }
    }

    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        self.write_rgb_bytes(&mut out);
        out
    }
}
