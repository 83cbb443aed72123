//! A paintable render target shared with other threads.

use std::sync::Arc;

use parking_lot::Mutex;
use vantage_core::hash::fingerprint_frame;
use vantage_core::{Fingerprint, FrameBuffer, VantageResult};

use crate::convert::Bitmap;
use crate::target::{Asset, SingleResolutionAsset};

/// Write access to a [`Canvas`] that stays usable after the canvas has been
/// handed to a renderer.
#[derive(Clone)]
pub struct CanvasHandle {
    pixels: Arc<Mutex<FrameBuffer>>,
}

impl CanvasHandle {
    /// Mutate the pixels. The renderer notices the change through the
    /// canvas fingerprint on its next iteration.
    pub fn paint<R>(&self, f: impl FnOnce(&mut FrameBuffer) -> R) -> R {
        f(&mut self.pixels.lock())
    }

    pub fn snapshot(&self) -> FrameBuffer {
        self.pixels.lock().clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let pixels = self.pixels.lock();
        (pixels.width, pixels.height)
    }
}

/// Static single-resolution target backed by a shared RGBA buffer.
pub struct Canvas {
    label: String,
    handle: CanvasHandle,
}

impl Canvas {
    pub fn new(label: impl Into<String>, width: u32, height: u32, background: [u8; 4]) -> Self {
        Self {
            label: label.into(),
            handle: CanvasHandle {
                pixels: Arc::new(Mutex::new(FrameBuffer::solid(width, height, background))),
            },
        }
    }

    pub fn handle(&self) -> CanvasHandle {
        self.handle.clone()
    }
}

impl Asset for Canvas {
    fn is_static(&self) -> bool {
        true
    }

    fn fingerprint(&self) -> Fingerprint {
        fingerprint_frame(&self.handle.pixels.lock())
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl SingleResolutionAsset for Canvas {
    fn bitmap(&mut self) -> VantageResult<Bitmap> {
        Ok(Bitmap::from(self.handle.snapshot()))
    }
}
