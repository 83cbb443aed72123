use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel), straight alpha.
    Rgba8,
    /// 8-bit RGB (3 bytes per pixel, no alpha).
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A tightly packed, row-major pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create an RGBA frame buffer filled with a single pixel value.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Wrap already packed RGBA8 data. Returns `None` if the length does not
    /// match the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        })
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Row length in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        let px = &self.data[offset..offset + bpp];
        match self.format {
            PixelFormat::Rgba8 => Some([px[0], px[1], px[2], px[3]]),
            PixelFormat::Rgb8 => Some([px[0], px[1], px[2], 255]),
        }
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        self.data[offset..offset + bpp].copy_from_slice(&rgba[..bpp]);
    }

    /// Fill an axis-aligned rectangle, clipped to the buffer bounds.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        let end_x = x.saturating_add(width).min(self.width);
        let end_y = y.saturating_add(height).min(self.height);
        for py in y..end_y {
            for px in x..end_x {
                self.set_pixel(px, py, rgba);
            }
        }
    }
}

/// A completed frame handed to frame sinks.
///
/// The pixel buffer is shared so that several subscribers can keep the same
/// frame alive without copying it.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// The produced pixels, always [`PixelFormat::Rgba8`].
    pub buffer: Arc<FrameBuffer>,
    /// Wall-clock time spent producing this frame.
    pub frame_delta: Duration,
    /// Per-renderer production counter, starting at 1.
    pub sequence: u64,
    /// Detail level the frame was produced at, for multi-resolution targets.
    pub detail_level: Option<u32>,
}

impl RenderedFrame {
    pub fn new(buffer: FrameBuffer, frame_delta: Duration, sequence: u64) -> Self {
        Self {
            buffer: Arc::new(buffer),
            frame_delta,
            sequence,
            detail_level: None,
        }
    }

    pub fn with_detail_level(mut self, level: u32) -> Self {
        self.detail_level = Some(level);
        self
    }

    /// Frame delta in whole milliseconds.
    pub fn frame_delta_millis(&self) -> u64 {
        self.frame_delta.as_millis() as u64
    }

    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    pub fn height(&self) -> u32 {
        self.buffer.height
    }
}
