//! HSL Color Space Module
//!
//! Everything the recoloring engine measures or shifts is expressed in HSL:
//! - Hue in degrees, circular, normalized into [0, 360)
//! - Saturation and lightness in percent, [0, 100]
//!
//! Also hosts the weighted color distance used by clustering, masking and
//! selection, the saturation-weighted circular mean, and hex parsing.

use palette::Srgb;
use serde::{Deserialize, Serialize};

/// Fallback for unparsable hex input
pub const MID_GRAY: [u8; 3] = [128, 128, 128];

/// A color in hue/saturation/lightness form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    /// Hue in degrees, [0, 360)
    pub h: f32,
    /// Saturation, [0, 100]
    pub s: f32,
    /// Lightness, [0, 100]
    pub l: f32,
}

impl Hsl {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: normalize_hue(h),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        rgb_to_hsl(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        let (r, g, b) = hsl_to_rgb(self.h, self.s, self.l);
        [r, g, b]
    }
}

// ============================================================================
// RGB <-> HSL
// ============================================================================

/// Wrap a hue in degrees into [0, 360)
pub fn normalize_hue(h: f32) -> f32 {
    let wrapped = h.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Convert sRGB (0-255) to HSL. Achromatic colors get hue 0.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl {
        h: normalize_hue(h * 60.0),
        s: s * 100.0,
        l: l * 100.0,
    }
}

/// Convert HSL back to sRGB (0-255), rounding each channel
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let h = normalize_hue(h) / 360.0;
    let s = s.clamp(0.0, 100.0) / 100.0;
    let l = l.clamp(0.0, 100.0) / 100.0;

    fn to_u8(c: f32) -> u8 {
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    }

    if s == 0.0 {
        let v = to_u8(l);
        return (v, v, v);
    }

    fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
        let t = if t < 0.0 {
            t + 1.0
        } else if t > 1.0 {
            t - 1.0
        } else {
            t
        };

        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        to_u8(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_u8(hue_to_channel(p, q, h)),
        to_u8(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

// ============================================================================
// DISTANCE METRIC
// ============================================================================

/// Shortest angular distance between two hues, [0, 180]
pub fn hue_distance(h1: f32, h2: f32) -> f32 {
    let d = (h1 - h2).abs().rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Weighted HSL distance used by clustering, masks and selection.
///
/// Hue difference is scaled by the pair's average saturation so that hue
/// stops mattering for near-gray colors.
pub fn color_distance(a: &Hsl, b: &Hsl) -> f32 {
    let hue_weight = (a.s + b.s) / 2.0 / 100.0;
    let dh = hue_distance(a.h, b.h) * hue_weight;
    let ds = a.s - b.s;
    let dl = a.l - b.l;
    (dh * dh + ds * ds + dl * dl).sqrt()
}

/// Interpolate from one hue to another along the shortest arc
pub fn lerp_hue(from: f32, to: f32, t: f32) -> f32 {
    let diff = (to - from + 540.0).rem_euclid(360.0) - 180.0;
    normalize_hue(from + diff * t)
}

// ============================================================================
// CIRCULAR MEAN
// ============================================================================

/// Running weighted mean of HSL samples.
///
/// Hue is averaged on the unit circle (sin/cos sums, then atan2), with each
/// sample's hue contribution additionally scaled by its saturation.
#[derive(Debug, Clone, Default)]
pub struct HslAccumulator {
    sin_sum: f32,
    cos_sum: f32,
    s_sum: f32,
    l_sum: f32,
    weight: f32,
}

impl HslAccumulator {
    pub fn add(&mut self, hsl: &Hsl, weight: f32) {
        let hue_weight = weight * hsl.s / 100.0;
        let rad = hsl.h.to_radians();
        self.sin_sum += rad.sin() * hue_weight;
        self.cos_sum += rad.cos() * hue_weight;
        self.s_sum += hsl.s * weight;
        self.l_sum += hsl.l * weight;
        self.weight += weight;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Weighted mean, or `None` if nothing was added
    pub fn mean(&self) -> Option<Hsl> {
        if self.weight <= 0.0 {
            return None;
        }

        let h = if self.sin_sum == 0.0 && self.cos_sum == 0.0 {
            0.0
        } else {
            normalize_hue(self.sin_sum.atan2(self.cos_sum).to_degrees())
        };

        Some(Hsl {
            h,
            s: (self.s_sum / self.weight).clamp(0.0, 100.0),
            l: (self.l_sum / self.weight).clamp(0.0, 100.0),
        })
    }
}

// ============================================================================
// HEX COLORS
// ============================================================================

/// Parse `#rrggbb` or `rrggbb` (case-insensitive). Short forms are rejected.
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let rgb: Srgb<u8> = digits.parse().ok()?;
    Some([rgb.red, rgb.green, rgb.blue])
}

/// Parse a hex color, falling back to mid-gray for bad input
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    parse_hex(hex).unwrap_or_else(|| {
        log::warn!("Invalid hex color {:?}, using mid-gray", hex);
        MID_GRAY
    })
}

pub fn hex_to_hsl(hex: &str) -> Hsl {
    Hsl::from_rgb(hex_to_rgb(hex))
}

pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

// ============================================================================
// TESTS
// ============================================================================
