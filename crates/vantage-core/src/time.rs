use std::time::{Duration, Instant};

/// Minimum spacing between frames for a frames-per-second cap.
/// Returns `None` for an unbounded cap (0).
pub fn min_frame_interval(max_fps: u32) -> Option<Duration> {
    if max_fps == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(1.0 / max_fps as f64))
}

/// Tracks when frames were produced and enforces a frames-per-second cap.
///
/// The cap is passed on every query rather than stored, so it can be changed
/// between frames without resetting the pacer.
#[derive(Debug, Clone, Default)]
pub struct FramePacer {
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before the next frame may start, or `None` if a frame is
    /// due now.
    pub fn remaining(&self, now: Instant, max_fps: u32) -> Option<Duration> {
        let interval = min_frame_interval(max_fps)?;
        let last = self.last_frame?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= interval {
            None
        } else {
            Some(interval - elapsed)
        }
    }

    /// Record that a frame started at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Forget the previous frame so the next one is due immediately.
    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}
