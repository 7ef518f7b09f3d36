//! Region Recoloring
//!
//! Shared shift primitive plus the multi-region compositor.
//!
//! Shifts are computed in HSL (rotate hue, scale saturation, offset
//! lightness) but candidate colors are blended in RGB, which keeps mask
//! edges free of hue-interpolation jumps at the 0/360 wrap.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use crate::color::{hex_to_hsl, lerp_hue, normalize_hue, Hsl};
use crate::masks::{region_masks, MaskSettings};
use crate::regions::ColorRegion;

// ============================================================================
// SHIFT PRIMITIVE
// ============================================================================

/// HSL offset that carries a source color onto a target color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HslShift {
    pub hue_shift: f32,
    pub sat_ratio: f32,
    pub light_shift: f32,
    pub target: Hsl,
}

impl HslShift {
    pub fn between(source: &Hsl, target: &Hsl) -> Self {
        Self {
            hue_shift: target.h - source.h,
            sat_ratio: if source.s > 0.0 { target.s / source.s } else { 1.0 },
            light_shift: target.l - source.l,
            target: *target,
        }
    }
}

/// How hue rotation is attenuated for low-saturation pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HueDamping {
    /// Full rotation everywhere
    None,
    /// Rotation scaled by `min(1, target_s / 30) * min(1, pixel_s / 20)`
    Weighted,
    /// Hue snaps to the target below s=8, blends toward the shifted hue
    /// up to s=20, full rotation above
    Threshold,
}

const TARGET_SAT_FULL: f32 = 30.0;
const PIXEL_SAT_FULL: f32 = 20.0;
const PIXEL_SAT_SNAP: f32 = 8.0;

/// Apply `shift` to one pixel, clamping S and L into range
pub fn apply_shift(pixel: &Hsl, shift: &HslShift, damping: HueDamping) -> Hsl {
    let shifted_hue = pixel.h + shift.hue_shift;

    let h = match damping {
        HueDamping::None => shifted_hue,
        HueDamping::Weighted => {
            let target_weight = (shift.target.s / TARGET_SAT_FULL).min(1.0);
            let pixel_weight = (pixel.s / PIXEL_SAT_FULL).min(1.0);
            pixel.h + shift.hue_shift * target_weight * pixel_weight
        }
        HueDamping::Threshold => {
            if pixel.s < PIXEL_SAT_SNAP {
                shift.target.h
            } else if pixel.s < PIXEL_SAT_FULL {
                let t = (pixel.s - PIXEL_SAT_SNAP) / (PIXEL_SAT_FULL - PIXEL_SAT_SNAP);
                lerp_hue(shift.target.h, normalize_hue(shifted_hue), t)
            } else {
                shifted_hue
            }
        }
    };

    Hsl {
        h: normalize_hue(h),
        s: (pixel.s * shift.sat_ratio).clamp(0.0, 100.0),
        l: (pixel.l + shift.light_shift).clamp(0.0, 100.0),
    }
}

// ============================================================================
// MULTI-REGION COMPOSITOR
// ============================================================================

/// Recolor every region that carries a target color.
///
/// Each targeted region proposes a damped-shift candidate per pixel; the
/// output is the mask-weighted average of those candidates over targeted
/// regions only. Pixels with no targeted weight pass through, alpha is
/// copied through, and a call with no targets returns an identical copy.
pub fn recolor_regions(img: &RgbaImage, regions: &[ColorRegion], settings: &MaskSettings) -> RgbaImage {
    let active: Vec<(usize, HslShift)> = regions
        .iter()
        .enumerate()
        .filter_map(|(i, region)| {
            region
                .target_color
                .as_deref()
                .map(|hex| (i, HslShift::between(&region.centroid, &hex_to_hsl(hex))))
        })
        .collect();

    if active.is_empty() {
        return img.clone();
    }

    log::info!(
        "Recoloring {} of {} regions ({} masks)",
        active.len(),
        regions.len(),
        if settings.hard { "hard" } else { "soft" }
    );

    let centroids: Vec<Hsl> = regions.iter().map(|r| r.centroid).collect();
    let masks = region_masks(img, &centroids, settings);

    let mut out = img.clone();
    for (idx, pixel) in out.pixels_mut().enumerate() {
        let [r, g, b, a] = pixel.0;
        let hsl = Hsl::from_rgb([r, g, b]);

        let mut sum = [0.0f32; 3];
        let mut active_weight = 0.0f32;

        for (region, shift) in &active {
            let weight = masks[*region].weights[idx];
            if weight <= 0.0 {
                continue;
            }
            let candidate = apply_shift(&hsl, shift, HueDamping::Weighted).to_rgb();
            for c in 0..3 {
                sum[c] += candidate[c] as f32 * weight;
            }
            active_weight += weight;
        }

        if active_weight <= 0.0 {
            continue;
        }

        let blend = |c: usize| (sum[c] / active_weight).round().clamp(0.0, 255.0) as u8;
        *pixel = Rgba([blend(0), blend(1), blend(2), a]);
    }

    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::{detect_regions, set_region_target, DetectionSettings};

    fn red_blue_image() -> RgbaImage {
        RgbaImage::from_fn(16, 8, |x, y| {
            let alpha = if y == 7 { 60 } else { 255 };
            if x < 8 {
                Rgba([255, 0, 0, alpha])
            } else {
                Rgba([0, 0, 255, alpha])
            }
        })
    }

    fn detect(img: &RgbaImage) -> Vec<ColorRegion> {
        let settings = DetectionSettings {
            region_count: 2,
            sample_stride: 1,
            seed: Some(3),
            ..Default::default()
        };
        detect_regions(img, &settings)
    }

    fn red_region_id(regions: &[ColorRegion]) -> usize {
        regions
            .iter()
            .find(|r| r.name == "Red")
            .map(|r| r.id)
            .unwrap()
    }

    #[test]
    fn test_shift_between_identity() {
        let color = Hsl::from_rgb([90, 160, 40]);
        let shift = HslShift::between(&color, &color);
        let out = apply_shift(&color, &shift, HueDamping::Weighted);
        assert!((out.h - color.h).abs() < 1e-3);
        assert!((out.s - color.s).abs() < 1e-3);
        assert!((out.l - color.l).abs() < 1e-3);
    }

    #[test]
    fn test_gray_source_keeps_saturation_ratio() {
        let shift = HslShift::between(&Hsl { h: 0.0, s: 0.0, l: 50.0 }, &Hsl { h: 200.0, s: 60.0, l: 40.0 });
        assert_eq!(shift.sat_ratio, 1.0);
        assert_eq!(shift.light_shift, -10.0);
    }

    #[test]
    fn test_weighted_damping_spares_gray_pixels() {
        let shift = HslShift::between(&Hsl { h: 0.0, s: 100.0, l: 50.0 }, &Hsl { h: 120.0, s: 100.0, l: 50.0 });
        let gray = Hsl { h: 10.0, s: 0.0, l: 40.0 };
        let half = Hsl { h: 10.0, s: 10.0, l: 40.0 };
        let vivid = Hsl { h: 10.0, s: 80.0, l: 40.0 };

        assert!((apply_shift(&gray, &shift, HueDamping::Weighted).h - 10.0).abs() < 1e-3);
        assert!((apply_shift(&half, &shift, HueDamping::Weighted).h - 70.0).abs() < 1e-3);
        assert!((apply_shift(&vivid, &shift, HueDamping::Weighted).h - 130.0).abs() < 1e-3);
    }

    #[test]
    fn test_weighted_damping_toward_gray_target() {
        let shift = HslShift::between(&Hsl { h: 0.0, s: 90.0, l: 50.0 }, &Hsl { h: 90.0, s: 15.0, l: 50.0 });
        let pixel = Hsl { h: 0.0, s: 90.0, l: 50.0 };
        assert!((apply_shift(&pixel, &shift, HueDamping::Weighted).h - 45.0).abs() < 1e-3);
    }

    #[test]
    fn test_threshold_damping_bands() {
        let shift = HslShift::between(&Hsl { h: 0.0, s: 50.0, l: 50.0 }, &Hsl { h: 200.0, s: 50.0, l: 50.0 });
        let snap = apply_shift(&Hsl { h: 30.0, s: 4.0, l: 50.0 }, &shift, HueDamping::Threshold);
        let mid = apply_shift(&Hsl { h: 30.0, s: 14.0, l: 50.0 }, &shift, HueDamping::Threshold);
        let full = apply_shift(&Hsl { h: 30.0, s: 40.0, l: 50.0 }, &shift, HueDamping::Threshold);

        assert!((snap.h - 200.0).abs() < 1e-3);
        assert!((mid.h - 215.0).abs() < 1e-3, "got {}", mid.h);
        assert!((full.h - 230.0).abs() < 1e-3);
    }

    #[test]
    fn test_shift_clamps_and_wraps() {
        let shift = HslShift::between(&Hsl { h: 300.0, s: 20.0, l: 20.0 }, &Hsl { h: 100.0, s: 80.0, l: 90.0 });
        let out = apply_shift(&Hsl { h: 350.0, s: 60.0, l: 50.0 }, &shift, HueDamping::None);
        assert!((out.h - 150.0).abs() < 1e-3);
        assert_eq!(out.s, 100.0);
        assert_eq!(out.l, 100.0);
    }

    #[test]
    fn test_no_targets_is_identical() {
        let img = red_blue_image();
        let regions = detect(&img);
        for hard in [true, false] {
            let out = recolor_regions(&img, &regions, &MaskSettings { hard, sharpness: 50.0 });
            assert_eq!(out.as_raw(), img.as_raw());
        }
    }

    #[test]
    fn test_hard_recolor_moves_only_target_region() {
        let img = red_blue_image();
        let mut regions = detect(&img);
        let red = red_region_id(&regions);
        set_region_target(&mut regions, red, Some("#00ff00")).unwrap();

        let out = recolor_regions(&img, &regions, &MaskSettings { hard: true, sharpness: 50.0 });
        assert_eq!(out.get_pixel(2, 2).0, [0, 255, 0, 255]);
        assert_eq!(out.get_pixel(12, 2).0, [0, 0, 255, 255]);
        // Transparent row passes through
        assert_eq!(out.get_pixel(2, 7).0, [255, 0, 0, 60]);
    }

    #[test]
    fn test_soft_recolor_averages_targeted_candidates() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 60, 60, 255]));
        let regions = vec![
            ColorRegion {
                id: 0,
                name: "Red".to_string(),
                centroid: Hsl::from_rgb([210, 50, 50]),
                target_color: Some("#3050c8".to_string()),
                pixel_count: 1,
            },
            ColorRegion {
                id: 1,
                name: "Pink".to_string(),
                centroid: Hsl::from_rgb([190, 70, 80]),
                target_color: None,
                pixel_count: 1,
            },
        ];
        let settings = MaskSettings { hard: false, sharpness: 50.0 };

        let centroids: Vec<Hsl> = regions.iter().map(|r| r.centroid).collect();
        let masks = region_masks(&img, &centroids, &settings);
        assert!(masks[1].weights[0] > 0.0);

        let pixel = Hsl::from_rgb([200, 60, 60]);
        let shift = HslShift::between(&regions[0].centroid, &hex_to_hsl("#3050c8"));
        let candidate = apply_shift(&pixel, &shift, HueDamping::Weighted).to_rgb();

        // The untargeted region's weight does not dilute the candidate
        let out = recolor_regions(&img, &regions, &settings);
        assert_eq!(&out.get_pixel(0, 0).0[..3], &candidate[..]);
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_soft_recolor_blends_two_targets() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 60, 60, 255]));
        let regions = vec![
            ColorRegion {
                id: 0,
                name: "Red".to_string(),
                centroid: Hsl::from_rgb([210, 50, 50]),
                target_color: Some("#3050c8".to_string()),
                pixel_count: 1,
            },
            ColorRegion {
                id: 1,
                name: "Pink".to_string(),
                centroid: Hsl::from_rgb([190, 70, 80]),
                target_color: Some("#20a040".to_string()),
                pixel_count: 1,
            },
        ];
        let settings = MaskSettings { hard: false, sharpness: 20.0 };

        let centroids: Vec<Hsl> = regions.iter().map(|r| r.centroid).collect();
        let masks = region_masks(&img, &centroids, &settings);
        let pixel = Hsl::from_rgb([200, 60, 60]);

        let mut sum = [0.0f32; 3];
        let mut total = 0.0f32;
        for (region, mask) in regions.iter().zip(&masks) {
            let target = hex_to_hsl(region.target_color.as_deref().unwrap());
            let shift = HslShift::between(&region.centroid, &target);
            let candidate = apply_shift(&pixel, &shift, HueDamping::Weighted).to_rgb();
            for c in 0..3 {
                sum[c] += candidate[c] as f32 * mask.weights[0];
            }
            total += mask.weights[0];
        }
        let expected: Vec<u8> = sum.iter().map(|s| (s / total).round() as u8).collect();

        let out = recolor_regions(&img, &regions, &settings);
        assert_eq!(&out.get_pixel(0, 0).0[..3], expected.as_slice());
    }

    #[test]
    fn test_alpha_is_preserved() {
        let img = RgbaImage::from_fn(10, 10, |x, y| Rgba([(x * 25) as u8, 90, (y * 25) as u8, (x * 20 + y) as u8 + 60]));
        let settings = DetectionSettings { region_count: 3, sample_stride: 1, seed: Some(11), ..Default::default() };
        let mut regions = detect_regions(&img, &settings);
        for id in 0..regions.len() {
            set_region_target(&mut regions, id, Some("#c08040")).unwrap();
        }

        for hard in [true, false] {
            let out = recolor_regions(&img, &regions, &MaskSettings { hard, sharpness: 30.0 });
            for (a, b) in img.pixels().zip(out.pixels()) {
                assert_eq!(a[3], b[3]);
            }
        }
    }
}
