//! Image loading module.
//! Decodes PNG, JPEG, GIF and other formats supported by `image` into
//! in-memory images that the bundled assets wrap.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use image::{AnimationDecoder, DynamicImage, RgbaImage};
use vantage_core::{VantageError, VantageResult};

/// Load an image file.
pub fn load_image(path: &Path) -> VantageResult<DynamicImage> {
    image::open(path).map_err(|e| {
        VantageError::asset(
            format!("failed to load image '{}': {}", path.display(), e),
            path,
        )
    })
}

/// Load an image from raw bytes (e.g., from an embedded asset).
pub fn load_image_from_bytes(data: &[u8]) -> VantageResult<DynamicImage> {
    image::load_from_memory(data)
        .map_err(|e| VantageError::asset(format!("failed to decode image: {}", e), "<memory>"))
}

/// Decode every frame of a GIF together with its display delay.
pub fn load_gif_frames_from_bytes(data: &[u8]) -> VantageResult<Vec<(RgbaImage, Duration)>> {
    let decoder = image::codecs::gif::GifDecoder::new(Cursor::new(data))
        .map_err(|e| VantageError::asset(format!("failed to decode GIF: {}", e), "<memory>"))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| VantageError::asset(format!("failed to decode GIF frame: {}", e), "<memory>"))?;

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 { 0 } else { numer / denom };
            (frame.into_buffer(), Duration::from_millis(delay_ms as u64))
        })
        .collect())
}

/// Decode every frame of a GIF file.
pub fn load_gif_frames(path: &Path) -> VantageResult<Vec<(RgbaImage, Duration)>> {
    let data = std::fs::read(path).map_err(|e| {
        VantageError::asset(format!("failed to read '{}': {}", path.display(), e), path)
    })?;
    load_gif_frames_from_bytes(&data)
}

/// Number of detail levels a halving pyramid of this size has, capped at
/// `max_levels`. Always at least 1.
pub fn pyramid_level_count(width: u32, height: u32, max_levels: u32) -> u32 {
    let largest = width.max(height).max(1);
    let natural = 32 - largest.leading_zeros();
    natural.min(max_levels.max(1))
}

/// Dimensions of detail level `level` of an image: each level halves the
/// previous one, never going below 1x1.
pub fn level_dimensions(width: u32, height: u32, level: u32) -> (u32, u32) {
    let shift = level.min(31);
    ((width >> shift).max(1), (height >> shift).max(1))
}
