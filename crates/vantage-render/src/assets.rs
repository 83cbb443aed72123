//! Image-backed render targets.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use rayon::prelude::*;
use vantage_core::hash::fingerprint_pixels;
use vantage_core::{Fingerprint, VantageError, VantageResult};

use crate::convert::Bitmap;
use crate::image_loader::{self, level_dimensions, pyramid_level_count};
use crate::target::{Asset, MultiResolutionAsset, SingleResolutionAsset};

fn fingerprint_image(img: &DynamicImage) -> Fingerprint {
    let rgba = img.to_rgba8();
    fingerprint_pixels(rgba.width(), rgba.height(), rgba.as_raw())
}

/// A still image with precomputed half-resolution levels.
///
/// Level 0 is the source image; every following level halves both
/// dimensions. Static: the fingerprint is computed once from the source.
pub struct ImagePyramid {
    label: String,
    levels: Vec<DynamicImage>,
    fingerprint: Fingerprint,
}

impl ImagePyramid {
    /// Build up to `max_levels` levels from `base`.
    pub fn from_image(label: impl Into<String>, base: DynamicImage, max_levels: u32) -> Self {
        let (width, height) = (base.width(), base.height());
        let count = pyramid_level_count(width, height, max_levels);

        // Every level is resampled from the source rather than the previous
        // level, so they can be built independently.
        let reduced: Vec<DynamicImage> = (1..count)
            .into_par_iter()
            .map(|level| {
                let (w, h) = level_dimensions(width, height, level);
                base.resize_exact(w, h, FilterType::Triangle)
            })
            .collect();

        let fingerprint = fingerprint_image(&base);
        let mut levels = Vec::with_capacity(count as usize);
        levels.push(base);
        levels.extend(reduced);

        Self {
            label: label.into(),
            levels,
            fingerprint,
        }
    }

    pub fn open(path: &Path, max_levels: u32) -> VantageResult<Self> {
        let base = image_loader::load_image(path)?;
        Ok(Self::from_image(path.display().to_string(), base, max_levels))
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level_dimensions(&self, level: u32) -> Option<(u32, u32)> {
        self.levels
            .get(level as usize)
            .map(|img| (img.width(), img.height()))
    }
}

impl Asset for ImagePyramid {
    fn is_static(&self) -> bool {
        true
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl MultiResolutionAsset for ImagePyramid {
    fn max_detail_index(&self) -> u32 {
        self.level_count()
    }

    fn bitmap_at_detail(&mut self, level: u32) -> VantageResult<Bitmap> {
        self.levels
            .get(level as usize)
            .cloned()
            .map(Bitmap::Image)
            .ok_or_else(|| {
                VantageError::asset(
                    format!("detail level {} out of range ({} levels)", level, self.levels.len()),
                    &self.label,
                )
            })
    }
}

/// A single-resolution still image.
pub struct StillImage {
    label: String,
    image: DynamicImage,
    fingerprint: Fingerprint,
}

impl StillImage {
    pub fn new(label: impl Into<String>, image: DynamicImage) -> Self {
        let fingerprint = fingerprint_image(&image);
        Self {
            label: label.into(),
            image,
            fingerprint,
        }
    }

    pub fn open(path: &Path) -> VantageResult<Self> {
        let image = image_loader::load_image(path)?;
        Ok(Self::new(path.display().to_string(), image))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl Asset for StillImage {
    fn is_static(&self) -> bool {
        true
    }

    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl SingleResolutionAsset for StillImage {
    fn bitmap(&mut self) -> VantageResult<Bitmap> {
        Ok(Bitmap::Image(self.image.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RenderTarget;
    use image::{Rgba, RgbaImage};

    fn checker(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }))
    }

    #[test]
    fn test_pyramid_levels_halve() {
        let pyramid = ImagePyramid::from_image("checker", checker(16, 8), 8);
        assert_eq!(pyramid.level_count(), 5);
        assert_eq!(pyramid.level_dimensions(0), Some((16, 8)));
        assert_eq!(pyramid.level_dimensions(1), Some((8, 4)));
        assert_eq!(pyramid.level_dimensions(4), Some((1, 1)));
        assert_eq!(pyramid.level_dimensions(5), None);
    }

    #[test]
    fn test_pyramid_respects_max_levels() {
        let pyramid = ImagePyramid::from_image("checker", checker(64, 64), 3);
        assert_eq!(pyramid.max_detail_index(), 3);
    }

    #[test]
    fn test_pyramid_target_clamps_quality() {
        let mut target =
            RenderTarget::multi_resolution(ImagePyramid::from_image("checker", checker(32, 32), 4));
        let coarse = target.produce(10).unwrap();
        assert_eq!(coarse.detail_level, Some(3));
        assert_eq!((coarse.buffer.width, coarse.buffer.height), (4, 4));

        let fine = target.produce(0).unwrap();
        assert_eq!((fine.buffer.width, fine.buffer.height), (32, 32));
    }

    #[test]
    fn test_out_of_range_level_is_error() {
        let mut pyramid = ImagePyramid::from_image("checker", checker(4, 4), 8);
        assert!(pyramid.bitmap_at_detail(2).is_ok());
        assert!(pyramid.bitmap_at_detail(3).is_err());
        assert!(pyramid.bitmap_at_detail(9).is_err());
    }

    #[test]
    fn test_fingerprint_depends_on_content() {
        let a = StillImage::new("a", checker(4, 4));
        let b = StillImage::new("b", checker(4, 4));
        let c = StillImage::new("c", checker(4, 2));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(a.is_static());
    }

    #[test]
    fn test_still_image_ignores_quality() {
        let mut target = RenderTarget::single_resolution(StillImage::new("still", checker(6, 3)));
        let produced = target.produce(7).unwrap();
        assert_eq!(produced.detail_level, None);
        assert_eq!((produced.buffer.width, produced.buffer.height), (6, 3));
        assert_eq!(produced.buffer.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(ImagePyramid::open(Path::new("/nonexistent/a.png"), 4).is_err());
        assert!(StillImage::open(Path::new("/nonexistent/a.png")).is_err());
    }
}
