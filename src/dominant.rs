//! Dominant Color Extraction and Global Adjustment
//!
//! The simplest recolor path: average the opaque pixels of a texture into one
//! dominant color, then move every pixel by the HSL offset between that color
//! and a single user-chosen target.

use image::{Rgba, RgbaImage};
use crate::color::{hex_to_hsl, Hsl, MID_GRAY};
use crate::recolor::{apply_shift, HslShift, HueDamping};
use crate::OPAQUE_ALPHA;

/// Only every Nth pixel is sampled when averaging
pub const SAMPLE_STRIDE: usize = 10;

/// Result of a global adjustment pass
#[derive(Debug, Clone)]
pub struct GlobalAdjustResult {
    pub image: RgbaImage,
    /// Dominant color of the input
    pub dominant: [u8; 3],
    /// Offset applied to every pixel
    pub shift: HslShift,
}

/// Mean RGB of sampled opaque pixels, mid-gray if there are none
pub fn dominant_color(img: &RgbaImage) -> [u8; 3] {
    let mut sums = [0u64; 3];
    let mut count = 0u64;

    for pixel in img.pixels().step_by(SAMPLE_STRIDE) {
        if pixel[3] >= OPAQUE_ALPHA {
            sums[0] += pixel[0] as u64;
            sums[1] += pixel[1] as u64;
            sums[2] += pixel[2] as u64;
            count += 1;
        }
    }

    if count == 0 {
        log::warn!("No opaque pixels sampled, dominant color defaults to mid-gray");
        return MID_GRAY;
    }

    let mean = |sum: u64| (sum as f64 / count as f64).round() as u8;
    [mean(sums[0]), mean(sums[1]), mean(sums[2])]
}

pub fn dominant_hsl(img: &RgbaImage) -> Hsl {
    Hsl::from_rgb(dominant_color(img))
}

/// Shift the whole image so its dominant color lands on `target_hex`.
///
/// Hue is rotated, saturation scaled and lightness offset, all without
/// damping. Alpha is copied through.
pub fn adjust_global(img: &RgbaImage, target_hex: &str) -> GlobalAdjustResult {
    let dominant = dominant_color(img);
    let shift = HslShift::between(&Hsl::from_rgb(dominant), &hex_to_hsl(target_hex));

    log::info!(
        "Global adjust: hue {:+.1}, saturation x{:.2}, lightness {:+.1}",
        shift.hue_shift,
        shift.sat_ratio,
        shift.light_shift
    );

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let shifted = apply_shift(&Hsl::from_rgb([r, g, b]), &shift, HueDamping::None).to_rgb();
        *pixel = Rgba([shifted[0], shifted[1], shifted[2], a]);
    }

    GlobalAdjustResult {
        image: out,
        dominant,
        shift,
    }
}

// ============================================================================
// TESTS
// ============================================================================
