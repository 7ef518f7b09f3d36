//! Region-aware texture recoloring core.
//!
//! Stateless operations over in-memory `RgbaImage` buffers:
//! - `dominant`: dominant color + single-target global adjustment
//! - `regions`: k-means region detection in HSL space
//! - `masks`: hard/soft region masks and sampled-color selection masks
//! - `recolor`: shared HSL shift primitive and multi-region compositor
//! - `selection`: click-to-sample color replacement
//!
//! Every call returns a new buffer; inputs are never modified.

pub mod color;
pub mod config;
pub mod dominant;
pub mod error;
pub mod masks;
pub mod recolor;
pub mod regions;
pub mod selection;

use image::RgbaImage;
use std::path::Path;

pub use color::Hsl;
pub use config::RecolorConfig;
pub use error::{RecolorError, Result};
pub use masks::{Mask, MaskSettings};
pub use regions::{ColorRegion, DetectionSettings};
pub use selection::ColorReplacement;

/// Pixels with alpha below this are ignored by sampling and masks
pub const OPAQUE_ALPHA: u8 = 128;

/// Wrap raw row-major RGBA bytes as a pixel buffer
pub fn pixel_buffer(width: u32, height: u32, data: Vec<u8>) -> Result<RgbaImage> {
    let expected = (width as usize) * (height as usize) * 4;
    let actual = data.len();
    RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        RecolorError::InvalidParameter(format!(
            "{}x{} RGBA buffer needs {} bytes, got {}",
            width, height, expected, actual
        ))
    })
}

/// Load an image from disk into memory
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| RecolorError::Processing(format!("Failed to load {}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

/// Save an in-memory image to disk
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save(path)?;
    Ok(())
}

/// Encode image as PNG bytes (for preview/transfer without file I/O)
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    use std::io::Cursor;
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| RecolorError::Processing(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
