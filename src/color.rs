//! Color triples and the integer distance math used on the hot path.
//!
//! A [`Color`] is three 8-bit channels with two coexisting interpretations:
//! sRGB for input/output and quantized OkLab for every similarity decision.
//! Distance arithmetic stays in 8-bit channels with 32-bit squared
//! accumulators; no floating point.

use rgb::RGB;

use crate::morton::MortonCode;
use crate::oklab::{oklab_to_srgb, srgb_to_oklab, OKLab};

/// Three 8-bit channels. Interpretation (sRGB or quantized OkLab) is up to
/// the caller; the engine never mixes the two in one computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl Color {
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        Self { x, y, z }
    }

    pub fn from_morton(code: MortonCode) -> Self {
        let (x, y, z) = code.decode();
        Self { x, y, z }
    }

    pub fn morton(self) -> MortonCode {
        MortonCode::encode(self.x, self.y, self.z)
    }

    /// Squared Euclidean distance between channel triples.
    /// Maximum value is 3 * 255² = 195075, well within u32.
    pub fn sq_dist(self, other: Self) -> u32 {
        sq_diff(self.x, other.x) + sq_diff(self.y, other.y) + sq_diff(self.z, other.z)
    }
}

pub fn sq_diff(a: u8, b: u8) -> u32 {
    let d = a as i32 - b as i32;
    (d * d) as u32
}

// --- OkLab ↔ 8-bit channel quantization ---
//
// L sits in [0, 1]; a and b sit in roughly [-0.4, 0.4]. Those ranges map
// linearly onto 0..255. The mapping round-trips exactly: dequantizing a
// channel and re-quantizing it gives the channel back, so placed codes
// are stable across encode/decode cycles.

const AB_MIN: f32 = -0.4;
const AB_RANGE: f32 = 0.8;

fn quantize(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Quantize an OkLab value to 8-bit channels.
pub fn lab_to_color(lab: OKLab) -> Color {
    Color {
        x: quantize(lab.l),
        y: quantize((lab.a - AB_MIN) / AB_RANGE),
        z: quantize((lab.b - AB_MIN) / AB_RANGE),
    }
}

/// Dequantize 8-bit channels back to an OkLab value.
pub fn color_to_lab(c: Color) -> OKLab {
    OKLab::new(
        c.x as f32 / 255.0,
        (c.y as f32 / 255.0) * AB_RANGE + AB_MIN,
        (c.z as f32 / 255.0) * AB_RANGE + AB_MIN,
    )
}

/// Convert an sRGB pixel to quantized OkLab channels.
pub fn rgb_to_lab(rgb: RGB<u8>) -> Color {
    lab_to_color(srgb_to_oklab(rgb.r, rgb.g, rgb.b))
}

/// Decode a Morton code of quantized OkLab channels back to sRGB.
pub fn lab_code_to_rgb(code: MortonCode) -> (u8, u8, u8) {
    oklab_to_srgb(color_to_lab(Color::from_morton(code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sq_diff_table() {
        let cases = [
            (0u8, 0u8, 0u32),
            (1, 1, 0),
            (2, 1, 1),
            (1, 2, 1),
            (2, 0, 4),
            (0, 2, 4),
            (255, 0, 255 * 255),
            (128, 255, 127 * 127),
            (255, 128, 127 * 127),
        ];
        for (a, b, want) in cases {
            assert_eq!(sq_diff(a, b), want, "sq_diff({a}, {b})");
        }
    }

    #[test]
    fn sq_dist_table() {
        let cases = [
            (Color::new(0, 0, 0), Color::new(0, 0, 0), 0),
            (Color::new(2, 0, 0), Color::new(0, 0, 0), 4),
            (Color::new(0, 2, 0), Color::new(0, 0, 0), 4),
            (Color::new(0, 0, 2), Color::new(0, 0, 0), 4),
            (Color::new(255, 255, 255), Color::new(1, 1, 1), 254 * 254 * 3),
        ];
        for (a, b, want) in cases {
            assert_eq!(a.sq_dist(b), want);
            assert_eq!(b.sq_dist(a), want);
        }
    }

    #[test]
    fn quantization_is_stable() {
        // quantize ∘ dequantize must be the identity on channel values
        for v in 0..=255u8 {
            let c = Color::new(v, v, v);
            assert_eq!(lab_to_color(color_to_lab(c)), c);
        }
    }

    #[test]
    fn black_and_white_are_extremes() {
        let black = rgb_to_lab(RGB { r: 0, g: 0, b: 0 });
        let white = rgb_to_lab(RGB {
            r: 255,
            g: 255,
            b: 255,
        });
        assert_eq!(black.x, 0);
        assert_eq!(white.x, 255);
        // neutral colors sit mid-range on the a/b axes
        assert!((black.y as i16 - 128).abs() <= 1);
        assert!((white.z as i16 - 128).abs() <= 1);
    }

    #[test]
    fn rgb_lab_rgb_roundtrip_is_close() {
        let cases = [(255u8, 0u8, 0u8), (0, 255, 0), (0, 0, 255), (37, 120, 200)];
        for (r, g, b) in cases {
            let code = rgb_to_lab(RGB { r, g, b }).morton();
            let (r2, g2, b2) = lab_code_to_rgb(code);
            assert!((r as i16 - r2 as i16).abs() <= 4, "{r} vs {r2}");
            assert!((g as i16 - g2 as i16).abs() <= 4, "{g} vs {g2}");
            assert!((b as i16 - b2 as i16).abs() <= 4, "{b} vs {b2}");
        }
    }
}
