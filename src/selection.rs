//! Click-to-Sample Color Replacement
//!
//! Each `ColorReplacement` selects pixels near a sampled source color and
//! moves them toward a target. Per pixel only the best-matching enabled
//! replacement applies; edges fade via `strength^0.7`.
//!
//! The shift is derived from the average of the matched pixels rather than
//! the single clicked pixel, so noisy source areas shift consistently.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use crate::color::{color_distance, hex_to_hsl, Hsl, HslAccumulator};
use crate::masks::{clamp_tolerance, selection_strength};
use crate::recolor::{apply_shift, HslShift, HueDamping};
use crate::OPAQUE_ALPHA;

const EDGE_BLEND_EXPONENT: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorReplacement {
    pub id: usize,
    /// Sampled color as `#rrggbb`
    pub source_color: String,
    pub target_color: String,
    /// Match tolerance, 0-100
    pub tolerance: f32,
    pub enabled: bool,
}

impl ColorReplacement {
    pub fn new(id: usize, source_color: &str, target_color: &str, tolerance: f32) -> Self {
        Self {
            id,
            source_color: source_color.to_string(),
            target_color: target_color.to_string(),
            tolerance,
            enabled: true,
        }
    }
}

struct PreparedReplacement {
    source: Hsl,
    tolerance: f32,
    shift: HslShift,
}

/// Mean HSL of the pixels matched by `source` within `tolerance`.
///
/// Each pixel counts by its match strength; hue additionally by saturation.
pub fn matched_average(img: &RgbaImage, source: &Hsl, tolerance: f32) -> Option<Hsl> {
    let mut sum = HslAccumulator::default();

    for pixel in img.pixels() {
        if pixel[3] < OPAQUE_ALPHA {
            continue;
        }
        let hsl = Hsl::from_rgb([pixel[0], pixel[1], pixel[2]]);
        let strength = selection_strength(&hsl, source, tolerance);
        if strength > 0.0 {
            sum.add(&hsl, strength);
        }
    }

    sum.mean()
}

fn prepare(img: &RgbaImage, replacement: &ColorReplacement) -> PreparedReplacement {
    let source = hex_to_hsl(&replacement.source_color);
    let tolerance = clamp_tolerance(replacement.tolerance);
    let average = matched_average(img, &source, tolerance).unwrap_or(source);

    PreparedReplacement {
        source,
        tolerance,
        shift: HslShift::between(&average, &hex_to_hsl(&replacement.target_color)),
    }
}

/// Apply all enabled replacements; returns an identical copy if none are enabled
pub fn apply_replacements(img: &RgbaImage, replacements: &[ColorReplacement]) -> RgbaImage {
    let prepared: Vec<PreparedReplacement> = replacements
        .iter()
        .filter(|r| r.enabled)
        .map(|r| prepare(img, r))
        .collect();

    if prepared.is_empty() {
        return img.clone();
    }

    log::info!("Applying {} color replacements", prepared.len());

    let mut out = img.clone();
    let mut changed = 0usize;

    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a < OPAQUE_ALPHA {
            continue;
        }
        let hsl = Hsl::from_rgb([r, g, b]);

        // Winner-take-all: closest source within its own tolerance
        let mut best: Option<(&PreparedReplacement, f32, f32)> = None;
        for candidate in &prepared {
            let strength = selection_strength(&hsl, &candidate.source, candidate.tolerance);
            if strength <= 0.0 {
                continue;
            }
            let dist = color_distance(&hsl, &candidate.source);
            if best.map_or(true, |(_, best_dist, _)| dist < best_dist) {
                best = Some((candidate, dist, strength));
            }
        }

        let Some((winner, _, strength)) = best else {
            continue;
        };

        let recolored = apply_shift(&hsl, &winner.shift, HueDamping::Threshold).to_rgb();
        let blend = strength.powf(EDGE_BLEND_EXPONENT);
        let original = [r, g, b];
        let mix = |c: usize| {
            let o = original[c] as f32;
            (o + (recolored[c] as f32 - o) * blend).round().clamp(0.0, 255.0) as u8
        };

        *pixel = Rgba([mix(0), mix(1), mix(2), a]);
        changed += 1;
    }

    log::debug!("Color replacements touched {} pixels", changed);
    out
}

// ============================================================================
// TESTS
// ============================================================================
