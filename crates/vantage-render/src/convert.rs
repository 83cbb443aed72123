//! Bitmap to frame buffer conversion.
//!
//! Render targets hand out pixels in whatever layout their backing store
//! uses. Everything leaving the renderer is packed, straight-alpha RGBA8, so
//! this module reorders channels row by row and drops stride padding.

use image::DynamicImage;
use vantage_core::{FrameBuffer, PixelFormat, VantageError, VantageResult};

/// Channel layout of a [`RawBitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Rgba8,
    Bgra8,
    /// BGRA with color channels premultiplied by alpha (the usual layout of
    /// platform surfaces).
    PremultipliedBgra8,
    Rgb8,
    Bgr8,
    Gray8,
}

impl SourceFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            SourceFormat::Rgba8 | SourceFormat::Bgra8 | SourceFormat::PremultipliedBgra8 => 4,
            SourceFormat::Rgb8 | SourceFormat::Bgr8 => 3,
            SourceFormat::Gray8 => 1,
        }
    }
}

/// A strided pixel buffer as exposed by an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBitmap {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of two consecutive rows.
    pub stride: usize,
    pub format: SourceFormat,
    pub data: Vec<u8>,
}

impl RawBitmap {
    /// A tightly packed bitmap (stride == width * bytes per pixel).
    pub fn packed(width: u32, height: u32, format: SourceFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            format,
            data,
        }
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    fn validate(&self) -> VantageResult<()> {
        let row = self.row_bytes();
        if self.stride < row {
            return Err(VantageError::InvalidBitmap(format!(
                "stride {} is shorter than a {}-byte row",
                self.stride, row
            )));
        }
        if self.height == 0 || self.width == 0 {
            return Ok(());
        }
        let needed = self.stride * (self.height as usize - 1) + row;
        if self.data.len() < needed {
            return Err(VantageError::InvalidBitmap(format!(
                "{}x{} {:?} bitmap needs {} bytes, got {}",
                self.width,
                self.height,
                self.format,
                needed,
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Pixel content handed out by a render target.
#[derive(Debug, Clone)]
pub enum Bitmap {
    Raw(RawBitmap),
    Image(DynamicImage),
}

impl Bitmap {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Bitmap::Raw(raw) => (raw.width, raw.height),
            Bitmap::Image(img) => (img.width(), img.height()),
        }
    }
}

impl From<RawBitmap> for Bitmap {
    fn from(raw: RawBitmap) -> Self {
        Bitmap::Raw(raw)
    }
}

impl From<DynamicImage> for Bitmap {
    fn from(img: DynamicImage) -> Self {
        Bitmap::Image(img)
    }
}

impl From<FrameBuffer> for Bitmap {
    fn from(fb: FrameBuffer) -> Self {
        let format = match fb.format {
            PixelFormat::Rgba8 => SourceFormat::Rgba8,
            PixelFormat::Rgb8 => SourceFormat::Rgb8,
        };
        Bitmap::Raw(RawBitmap::packed(fb.width, fb.height, format, fb.data))
    }
}

/// Convert a bitmap into a packed RGBA8 frame buffer.
pub fn to_frame_buffer(bitmap: Bitmap) -> VantageResult<FrameBuffer> {
    match bitmap {
        Bitmap::Image(img) => {
            let rgba = img.into_rgba8();
            let (width, height) = rgba.dimensions();
            let mut fb = FrameBuffer::new(width, height, PixelFormat::Rgba8);
            fb.data = rgba.into_raw();
            Ok(fb)
        }
        Bitmap::Raw(raw) => convert_raw(raw),
    }
}

fn convert_raw(raw: RawBitmap) -> VantageResult<FrameBuffer> {
    raw.validate()?;

    let row = raw.row_bytes();
    let expected = row * raw.height as usize;

    // Already in the output layout: take the buffer as is.
    let out = if raw.format == SourceFormat::Rgba8 && raw.stride == row && raw.data.len() == expected
    {
        raw.data
    } else {
        reorder_rows(&raw)
    };

    FrameBuffer::from_rgba8(raw.width, raw.height, out)
        .ok_or_else(|| VantageError::InvalidBitmap("converted buffer size mismatch".into()))
}

fn reorder_rows(raw: &RawBitmap) -> Vec<u8> {
    let row = raw.row_bytes();
    let mut out = Vec::with_capacity(raw.width as usize * raw.height as usize * 4);
    for y in 0..raw.height as usize {
        let start = y * raw.stride;
        let src = &raw.data[start..start + row];
        match raw.format {
            SourceFormat::Rgba8 => out.extend_from_slice(src),
            SourceFormat::Bgra8 => {
                for px in src.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            SourceFormat::PremultipliedBgra8 => {
                for px in src.chunks_exact(4) {
                    let a = px[3];
                    out.extend_from_slice(&[
                        unpremultiply(px[2], a),
                        unpremultiply(px[1], a),
                        unpremultiply(px[0], a),
                        a,
                    ]);
                }
            }
            SourceFormat::Rgb8 => {
                for px in src.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
            }
            SourceFormat::Bgr8 => {
                for px in src.chunks_exact(3) {
                    out.extend_from_slice(&[px[2], px[1], px[0], 255]);
                }
            }
            SourceFormat::Gray8 => {
                for &v in src {
                    out.extend_from_slice(&[v, v, v, 255]);
                }
            }
        }
    }
    out
}

#[inline]
fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    match alpha {
        0 => 0,
        255 => channel,
        a => {
            let a = a as u32;
            ((channel as u32 * 255 + a / 2) / a).min(255) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_rgba_packed_is_moved_unchanged() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let fb = to_frame_buffer(RawBitmap::packed(2, 1, SourceFormat::Rgba8, data.clone()).into())
            .unwrap();
        assert_eq!(fb.data, data);
        assert_eq!(fb.format, PixelFormat::Rgba8);
    }

    #[test]
    fn test_bgra_is_reordered() {
        let raw = RawBitmap::packed(1, 1, SourceFormat::Bgra8, vec![10, 20, 30, 40]);
        let fb = to_frame_buffer(raw.into()).unwrap();
        assert_eq!(fb.get_pixel(0, 0), Some([30, 20, 10, 40]));
    }

    #[test]
    fn test_premultiplied_bgra_is_unpremultiplied() {
        // 50% alpha white premultiplied is (128, 128, 128, 128).
        let raw = RawBitmap::packed(
            2,
            1,
            SourceFormat::PremultipliedBgra8,
            vec![128, 128, 128, 128, 0, 0, 0, 0],
        );
        let fb = to_frame_buffer(raw.into()).unwrap();
        assert_eq!(fb.get_pixel(0, 0), Some([255, 255, 255, 128]));
        assert_eq!(fb.get_pixel(1, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_rgb_bgr_and_gray_get_opaque_alpha() {
        let rgb = to_frame_buffer(RawBitmap::packed(1, 1, SourceFormat::Rgb8, vec![1, 2, 3]).into())
            .unwrap();
        assert_eq!(rgb.get_pixel(0, 0), Some([1, 2, 3, 255]));

        let bgr = to_frame_buffer(RawBitmap::packed(1, 1, SourceFormat::Bgr8, vec![1, 2, 3]).into())
            .unwrap();
        assert_eq!(bgr.get_pixel(0, 0), Some([3, 2, 1, 255]));

        let gray =
            to_frame_buffer(RawBitmap::packed(2, 1, SourceFormat::Gray8, vec![7, 9]).into()).unwrap();
        assert_eq!(gray.get_pixel(1, 0), Some([9, 9, 9, 255]));
    }

    #[test]
    fn test_stride_padding_is_dropped() {
        // 2x2 RGB with 2 bytes of padding per row.
        let raw = RawBitmap {
            width: 2,
            height: 2,
            stride: 8,
            format: SourceFormat::Rgb8,
            data: vec![
                1, 1, 1, 2, 2, 2, 0xEE, 0xEE, //
                3, 3, 3, 4, 4, 4, 0xEE, 0xEE,
            ],
        };
        let fb = to_frame_buffer(raw.into()).unwrap();
        assert_eq!(fb.byte_size(), 16);
        assert_eq!(fb.get_pixel(1, 0), Some([2, 2, 2, 255]));
        assert_eq!(fb.get_pixel(0, 1), Some([3, 3, 3, 255]));
    }

    #[test]
    fn test_last_row_may_omit_padding() {
        let raw = RawBitmap {
            width: 1,
            height: 2,
            stride: 8,
            format: SourceFormat::Rgba8,
            data: vec![1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8],
        };
        let fb = to_frame_buffer(raw.into()).unwrap();
        assert_eq!(fb.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_short_stride_is_rejected() {
        let raw = RawBitmap {
            width: 4,
            height: 1,
            stride: 3,
            format: SourceFormat::Rgba8,
            data: vec![0; 16],
        };
        let err = to_frame_buffer(raw.into()).unwrap_err();
        assert!(matches!(err, VantageError::InvalidBitmap(_)));
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let raw = RawBitmap::packed(4, 4, SourceFormat::Bgra8, vec![0; 60]);
        assert!(matches!(
            to_frame_buffer(raw.into()),
            Err(VantageError::InvalidBitmap(_))
        ));
    }

    #[test]
    fn test_dynamic_image_conversion() {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let bitmap = Bitmap::from(DynamicImage::ImageRgb8(img));
        assert_eq!(bitmap.dimensions(), (3, 2));
        let fb = to_frame_buffer(bitmap).unwrap();
        assert_eq!((fb.width, fb.height), (3, 2));
        assert_eq!(fb.get_pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_frame_buffer_into_bitmap() {
        let fb = FrameBuffer::solid(2, 2, [5, 6, 7, 8]);
        let back = to_frame_buffer(Bitmap::from(fb.clone())).unwrap();
        assert_eq!(back, fb);
    }
}
