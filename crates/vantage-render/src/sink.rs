//! Frame sinks: where produced frames go.
//!
//! Sinks are called synchronously on the producing thread while the render
//! target lock is held, so they should hand frames off quickly. A sink may
//! change the render target; the change is applied once every sink has
//! returned. It must not call `render_once`.

use std::sync::mpsc;

use vantage_core::{RenderedFrame, VantageError};

/// Receives frames produced by a [`ViewportRenderer`](crate::ViewportRenderer).
pub trait FrameSink: Send + Sync {
    fn frame_ready(&self, frame: RenderedFrame);

    /// A production attempt failed and no frame was published.
    fn frame_failed(&self, _error: &VantageError) {}
}

impl<F> FrameSink for F
where
    F: Fn(RenderedFrame) + Send + Sync,
{
    fn frame_ready(&self, frame: RenderedFrame) {
        self(frame)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Message delivered by a [`ChannelSink`].
#[derive(Debug)]
pub enum FrameEvent {
    Frame(RenderedFrame),
    Failed(String),
}

/// Forwards frames over a channel, typically to a UI thread.
///
/// Send errors (the receiver was dropped) are ignored: the renderer keeps
/// running and frames are discarded until the sink is unsubscribed.
pub struct ChannelSink {
    tx: mpsc::Sender<FrameEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<FrameEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn frame_ready(&self, frame: RenderedFrame) {
        let _ = self.tx.send(FrameEvent::Frame(frame));
    }

    fn frame_failed(&self, error: &VantageError) {
        let _ = self.tx.send(FrameEvent::Failed(error.to_string()));
    }
}
