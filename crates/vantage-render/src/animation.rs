//! Animated render targets.

use std::path::Path;
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbaImage};
use vantage_core::{Fingerprint, VantageError, VantageResult};

use crate::convert::Bitmap;
use crate::image_loader;
use crate::target::{Asset, SingleResolutionAsset};

/// Source of "now" for frame selection; swapped out in tests.
type Clock = Box<dyn FnMut() -> Instant + Send>;

/// A looping sequence of frames with per-frame delays.
///
/// Dynamic: the frame shown is chosen from the wall-clock time since the first
/// bitmap request, so every render iteration may see new content. When all
/// delays are zero the animation advances one frame per request instead.
pub struct AnimatedImage {
    label: String,
    frames: Vec<(RgbaImage, Duration)>,
    total: Duration,
    started: Option<Instant>,
    cursor: usize,
    clock: Clock,
}

impl AnimatedImage {
    pub fn from_frames(
        label: impl Into<String>,
        frames: Vec<(RgbaImage, Duration)>,
    ) -> VantageResult<Self> {
        let label = label.into();
        if frames.is_empty() {
            return Err(VantageError::asset("animation has no frames", &label));
        }
        let total = frames.iter().map(|(_, delay)| *delay).sum();
        Ok(Self {
            label,
            frames,
            total,
            started: None,
            cursor: 0,
            clock: Box::new(Instant::now),
        })
    }

    pub fn open_gif(path: &Path) -> VantageResult<Self> {
        let frames = image_loader::load_gif_frames(path)?;
        Self::from_frames(path.display().to_string(), frames)
    }

    pub fn from_gif_bytes(label: impl Into<String>, data: &[u8]) -> VantageResult<Self> {
        Self::from_frames(label, image_loader::load_gif_frames_from_bytes(data)?)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame most recently handed out.
    pub fn current_frame(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: impl FnMut() -> Instant + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn frame_at(&self, elapsed: Duration) -> usize {
        let mut offset = Duration::from_nanos((elapsed.as_nanos() % self.total.as_nanos()) as u64);
        for (index, (_, delay)) in self.frames.iter().enumerate() {
            if offset < *delay {
                return index;
            }
            offset -= *delay;
        }
        self.frames.len() - 1
    }

    fn advance(&mut self) -> usize {
        let now = (self.clock)();
        match self.started {
            None => {
                self.started = Some(now);
                0
            }
            Some(_) if self.total.is_zero() => (self.cursor + 1) % self.frames.len(),
            Some(start) => self.frame_at(now.saturating_duration_since(start)),
        }
    }
}

impl Asset for AnimatedImage {
    fn is_static(&self) -> bool {
        false
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint(self.cursor as u64)
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

impl SingleResolutionAsset for AnimatedImage {
    fn bitmap(&mut self) -> VantageResult<Bitmap> {
        self.cursor = self.advance();
        let (frame, _) = &self.frames[self.cursor];
        Ok(Bitmap::Image(DynamicImage::ImageRgba8(frame.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    fn frames(delays_ms: &[u64]) -> Vec<(RgbaImage, Duration)> {
        delays_ms
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                (
                    RgbaImage::from_pixel(2, 2, Rgba([i as u8, 0, 0, 255])),
                    Duration::from_millis(*ms),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_animation_is_rejected() {
        assert!(AnimatedImage::from_frames("empty", Vec::new()).is_err());
    }

    #[test]
    fn test_frame_selection_follows_clock() {
        let now = Arc::new(Mutex::new(Instant::now()));
        let clock = {
            let now = Arc::clone(&now);
            move || *now.lock().unwrap()
        };
        let mut anim = AnimatedImage::from_frames("clip", frames(&[100, 50, 100]))
            .unwrap()
            .with_clock(clock);
        assert!(!anim.is_static());

        anim.bitmap().unwrap();
        assert_eq!(anim.current_frame(), 0);

        let step = |ms: u64, expected: usize, anim: &mut AnimatedImage| {
            *now.lock().unwrap() += Duration::from_millis(ms);
            anim.bitmap().unwrap();
            assert_eq!(anim.current_frame(), expected);
        };
        step(99, 0, &mut anim);
        step(1, 1, &mut anim);
        step(50, 2, &mut anim);
        // 250ms total: wraps around.
        step(100, 0, &mut anim);
    }

    #[test]
    fn test_zero_delays_advance_per_request() {
        let mut anim = AnimatedImage::from_frames("flip", frames(&[0, 0, 0])).unwrap();
        let mut seen = Vec::new();
        for _ in 0..5 {
            let bitmap = anim.bitmap().unwrap();
            assert_eq!(bitmap.dimensions(), (2, 2));
            seen.push(anim.current_frame());
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_bitmap_pixels_match_frame() {
        let mut anim = AnimatedImage::from_frames("flip", frames(&[0, 0])).unwrap();
        anim.bitmap().unwrap();
        let second = crate::convert::to_frame_buffer(anim.bitmap().unwrap()).unwrap();
        assert_eq!(second.get_pixel(0, 0), Some([1, 0, 0, 255]));
    }
}
