//! Per-Pixel Influence Masks
//!
//! Turns region centroids (or one sampled color plus tolerance) into
//! full-resolution weights in [0, 1]:
//! - Hard: nearest region gets 1, all others 0
//! - Soft: Gaussian falloff on distance beyond the nearest region,
//!   normalized so each pixel's weights sum to 1
//!
//! Pixels below `OPAQUE_ALPHA` always get weight 0.

use image::{GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use crate::color::{color_distance, hex_to_hsl, Hsl};
use crate::error::{RecolorError, Result};
use crate::regions::{nearest_centroid, ColorRegion};
use crate::OPAQUE_ALPHA;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSettings {
    /// Winner-take-all masks instead of soft falloff (default: false)
    pub hard: bool,
    /// Edge sharpness 0-100, higher = tighter falloff (default: 50)
    pub sharpness: f32,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            hard: false,
            sharpness: 50.0,
        }
    }
}

impl MaskSettings {
    /// Gaussian divisor: 2000 at sharpness 0, 50 at sharpness 100
    pub fn falloff_divisor(&self) -> f32 {
        if !(0.0..=100.0).contains(&self.sharpness) {
            log::warn!("Sharpness {} out of range, clamping to 0-100", self.sharpness);
        }
        let sharpness = (self.sharpness / 100.0).clamp(0.0, 1.0);
        50.0 + (1.0 - sharpness) * 1950.0
    }
}

/// Row-major weights for one region or selection
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub weights: Vec<f32>,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            weights: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.weights[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Grayscale preview, weight 1.0 -> 255
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([(self.get(x, y) * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }
}

// ============================================================================
// REGION MASKS
// ============================================================================

/// One mask per centroid, in the same order
pub fn region_masks(img: &RgbaImage, centroids: &[Hsl], settings: &MaskSettings) -> Vec<Mask> {
    let (width, height) = img.dimensions();
    let mut masks = vec![Mask::empty(width, height); centroids.len()];
    if centroids.is_empty() {
        return masks;
    }

    let divisor = settings.falloff_divisor();
    let mut distances = vec![0.0f32; centroids.len()];

    for (idx, pixel) in img.pixels().enumerate() {
        if pixel[3] < OPAQUE_ALPHA {
            continue;
        }
        let hsl = Hsl::from_rgb([pixel[0], pixel[1], pixel[2]]);

        if settings.hard {
            masks[nearest_centroid(&hsl, centroids)].weights[idx] = 1.0;
            continue;
        }

        for (dist, centroid) in distances.iter_mut().zip(centroids) {
            *dist = color_distance(&hsl, centroid);
        }
        let min_dist = distances.iter().copied().fold(f32::INFINITY, f32::min);

        // Nearest region contributes exp(0) = 1, so total >= 1
        let mut total = 0.0f32;
        for (mask, &dist) in masks.iter_mut().zip(&distances) {
            let excess = dist - min_dist;
            let weight = (-(excess * excess) / divisor).exp();
            mask.weights[idx] = weight;
            total += weight;
        }
        for mask in masks.iter_mut() {
            mask.weights[idx] /= total;
        }
    }

    masks
}

/// Mask of region `id`, computed against the full region set
pub fn region_mask(
    img: &RgbaImage,
    regions: &[ColorRegion],
    id: usize,
    settings: &MaskSettings,
) -> Result<Mask> {
    let position = regions
        .iter()
        .position(|r| r.id == id)
        .ok_or(RecolorError::UnknownRegion(id))?;

    let centroids: Vec<Hsl> = regions.iter().map(|r| r.centroid).collect();
    let mut masks = region_masks(img, &centroids, settings);
    Ok(masks.swap_remove(position))
}

// ============================================================================
// SELECTION MASKS
// ============================================================================

/// Clamp a user tolerance into 0-100
pub fn clamp_tolerance(tolerance: f32) -> f32 {
    let clamped = tolerance.clamp(0.0, 100.0);
    if clamped != tolerance {
        log::warn!("Tolerance {} out of range, using {}", tolerance, clamped);
    }
    clamped
}

/// Distance at which a selection fades out completely
pub fn selection_max_distance(tolerance: f32) -> f32 {
    tolerance.clamp(0.0, 100.0) * 1.5
}

/// Match strength of `pixel` against a sampled `source` color.
///
/// `(1 - dist / max_dist)^0.5` inside the tolerance, 0 at and beyond it.
/// Zero tolerance selects exact matches only.
pub fn selection_strength(pixel: &Hsl, source: &Hsl, tolerance: f32) -> f32 {
    let dist = color_distance(pixel, source);
    let max_dist = selection_max_distance(tolerance);

    if max_dist <= 0.0 {
        return if dist == 0.0 { 1.0 } else { 0.0 };
    }
    if dist >= max_dist {
        return 0.0;
    }
    (1.0 - dist / max_dist).sqrt()
}

/// Full-resolution mask for a click-sampled color
pub fn selection_mask(img: &RgbaImage, source_hex: &str, tolerance: f32) -> Mask {
    let source = hex_to_hsl(source_hex);
    let tolerance = clamp_tolerance(tolerance);
    let (width, height) = img.dimensions();
    let mut mask = Mask::empty(width, height);

    for (weight, pixel) in mask.weights.iter_mut().zip(img.pixels()) {
        if pixel[3] >= OPAQUE_ALPHA {
            *weight = selection_strength(&Hsl::from_rgb([pixel[0], pixel[1], pixel[2]]), &source, tolerance);
        }
    }

    mask
}

// ============================================================================
// TESTS
// ============================================================================
