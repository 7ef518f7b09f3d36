//! Color Region Detection
//!
//! Groups a texture's opaque pixels into 2-4 perceptually distinct regions
//! with k-means run directly in HSL space:
//! 1. Strided sample of opaque pixels, converted to HSL
//! 2. Farthest-point seeding (first centroid random)
//! 3. Up to `max_iterations` assign/update passes; hue is a circular mean
//! 4. Final reassignment for pixel counts, regions sorted largest first
//!
//! Randomness is injectable so detection is reproducible under test.

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use crate::color::{color_distance, hex_to_rgb, rgb_to_hex, Hsl, HslAccumulator};
use crate::error::{RecolorError, Result};
use crate::OPAQUE_ALPHA;

pub const MIN_REGIONS: usize = 2;
pub const MAX_REGIONS: usize = 4;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Number of regions to find, clamped to 2-4 (default: 3)
    pub region_count: usize,
    /// Sample every Nth pixel for clustering (default: 4)
    pub sample_stride: usize,
    /// Cap on assign/update passes (default: 10)
    pub max_iterations: usize,
    /// Stop once no centroid moves further than this (default: 1.0)
    pub convergence_threshold: f32,
    /// Fixed seed for reproducible clustering; entropy-seeded when unset
    pub seed: Option<u64>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            region_count: 3,
            sample_stride: 4,
            max_iterations: 10,
            convergence_threshold: 1.0,
            seed: None,
        }
    }
}

impl DetectionSettings {
    fn effective_region_count(&self) -> usize {
        let clamped = self.region_count.clamp(MIN_REGIONS, MAX_REGIONS);
        if clamped != self.region_count {
            log::warn!("Region count {} out of range, using {}", self.region_count, clamped);
        }
        clamped
    }
}

/// One detected color region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRegion {
    /// Position in the detection result, 0 = largest region
    pub id: usize,
    /// Display name derived from the centroid, e.g. "Dark Blue"
    pub name: String,
    pub centroid: Hsl,
    /// Recolor target as `#rrggbb`; regions without one are left alone
    pub target_color: Option<String>,
    /// Sampled pixels assigned to this region
    pub pixel_count: usize,
}

impl ColorRegion {
    /// Centroid as `#rrggbb` for swatches
    pub fn hex(&self) -> String {
        rgb_to_hex(self.centroid.to_rgb())
    }
}

// ============================================================================
// NAMING
// ============================================================================

/// Human-readable color family for a centroid
pub fn region_name(hsl: &Hsl) -> String {
    if hsl.s < 15.0 {
        let gray = if hsl.l < 20.0 {
            "Black"
        } else if hsl.l < 40.0 {
            "Dark Gray"
        } else if hsl.l < 60.0 {
            "Gray"
        } else if hsl.l < 80.0 {
            "Light Gray"
        } else {
            "White"
        };
        return gray.to_string();
    }

    let family = if hsl.h < 15.0 {
        "Red"
    } else if hsl.h < 45.0 {
        "Orange"
    } else if hsl.h < 70.0 {
        "Yellow"
    } else if hsl.h < 160.0 {
        "Green"
    } else if hsl.h < 195.0 {
        "Cyan"
    } else if hsl.h < 255.0 {
        "Blue"
    } else if hsl.h < 285.0 {
        "Purple"
    } else if hsl.h < 335.0 {
        "Pink"
    } else {
        "Red"
    };

    if hsl.l < 30.0 {
        format!("Dark {}", family)
    } else if hsl.l > 70.0 {
        format!("Light {}", family)
    } else {
        family.to_string()
    }
}

// ============================================================================
// K-MEANS IN HSL
// ============================================================================

fn sample_pixels(img: &RgbaImage, stride: usize) -> Vec<Hsl> {
    img.pixels()
        .step_by(stride.max(1))
        .filter(|p| p[3] >= OPAQUE_ALPHA)
        .map(|p| Hsl::from_rgb([p[0], p[1], p[2]]))
        .collect()
}

/// Index of the closest centroid; ties go to the lower index
pub(crate) fn nearest_centroid(pixel: &Hsl, centroids: &[Hsl]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = color_distance(pixel, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Random first centroid, then repeatedly the sample farthest from all chosen
fn init_centroids<R: Rng + ?Sized>(samples: &[Hsl], k: usize, rng: &mut R) -> Vec<Hsl> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(samples[rng.gen_range(0..samples.len())]);

    while centroids.len() < k {
        let mut farthest = samples[0];
        let mut farthest_dist = -1.0f32;

        for sample in samples {
            let min_dist = centroids
                .iter()
                .map(|c| color_distance(sample, c))
                .fold(f32::INFINITY, f32::min);
            if min_dist > farthest_dist {
                farthest_dist = min_dist;
                farthest = *sample;
            }
        }

        centroids.push(farthest);
    }

    centroids
}

/// Detect regions with an RNG seeded from `settings.seed` (or entropy)
pub fn detect_regions(img: &RgbaImage, settings: &DetectionSettings) -> Vec<ColorRegion> {
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    detect_regions_with_rng(img, settings, &mut rng)
}

/// Cluster sampled opaque pixels into regions using the supplied RNG.
///
/// Empty clusters are reseeded with a random sample, so results depend on
/// the RNG state. Returns an empty list when no opaque pixel is sampled.
pub fn detect_regions_with_rng<R: Rng + ?Sized>(
    img: &RgbaImage,
    settings: &DetectionSettings,
    rng: &mut R,
) -> Vec<ColorRegion> {
    let samples = sample_pixels(img, settings.sample_stride);
    if samples.is_empty() {
        log::warn!("No opaque pixels to cluster");
        return Vec::new();
    }

    let k = settings.effective_region_count().min(samples.len());
    log::info!("Detecting {} regions from {} samples", k, samples.len());

    let mut centroids = init_centroids(&samples, k, rng);
    let mut assignments = vec![0usize; samples.len()];

    for iteration in 0..settings.max_iterations {
        for (assignment, sample) in assignments.iter_mut().zip(&samples) {
            *assignment = nearest_centroid(sample, &centroids);
        }

        let mut sums = vec![HslAccumulator::default(); k];
        for (sample, &cluster) in samples.iter().zip(&assignments) {
            sums[cluster].add(sample, 1.0);
        }

        let mut max_movement = 0.0f32;
        for (cluster, (centroid, sum)) in centroids.iter_mut().zip(&sums).enumerate() {
            let next = match sum.mean() {
                Some(mean) => mean,
                None => {
                    log::debug!("Cluster {} empty on pass {}, reseeding", cluster, iteration + 1);
                    samples[rng.gen_range(0..samples.len())]
                }
            };
            max_movement = max_movement.max(color_distance(centroid, &next));
            *centroid = next;
        }

        log::debug!("Pass {}: max centroid movement {:.3}", iteration + 1, max_movement);
        if max_movement <= settings.convergence_threshold {
            log::debug!("Converged after {} passes", iteration + 1);
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for sample in &samples {
        counts[nearest_centroid(sample, &centroids)] += 1;
    }

    let mut regions: Vec<ColorRegion> = centroids
        .into_iter()
        .zip(counts)
        .map(|(centroid, pixel_count)| ColorRegion {
            id: 0,
            name: region_name(&centroid),
            centroid,
            target_color: None,
            pixel_count,
        })
        .collect();

    regions.sort_by(|a, b| b.pixel_count.cmp(&a.pixel_count));
    for (id, region) in regions.iter_mut().enumerate() {
        region.id = id;
    }

    regions
}

// ============================================================================
// TARGET ASSIGNMENT
// ============================================================================

/// Set (or clear, with `None`) the target color of region `id`.
///
/// Unparsable hex becomes mid-gray; an id missing from `regions` is a
/// caller bug and returns `UnknownRegion`.
pub fn set_region_target(regions: &mut [ColorRegion], id: usize, hex: Option<&str>) -> Result<()> {
    let region = regions
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(RecolorError::UnknownRegion(id))?;

    region.target_color = hex.map(|h| rgb_to_hex(hex_to_rgb(h)));
    Ok(())
}

pub fn clear_region_targets(regions: &mut [ColorRegion]) {
    for region in regions {
        region.target_color = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================
