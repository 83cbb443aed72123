//! # vantage-render
//!
//! The Vantage viewport renderer. A background thread owns the current render
//! target, produces frames from it when they are due and publishes them to
//! subscribed sinks, typically a UI thread.
//!
//! Static targets are only re-rendered when their content fingerprint changes
//! or a new quality level is requested; dynamic targets are rendered on every
//! loop iteration, subject to the optional frame-rate cap.

pub mod animation;
pub mod assets;
pub mod canvas;
pub mod convert;
pub mod image_loader;
pub mod renderer;
pub mod sink;
pub mod target;

pub use animation::AnimatedImage;
pub use assets::{ImagePyramid, StillImage};
pub use canvas::{Canvas, CanvasHandle};
pub use convert::{Bitmap, RawBitmap, SourceFormat};
pub use renderer::{FrameStats, IterationOutcome, ViewportRenderer};
pub use sink::{ChannelSink, FrameEvent, FrameSink, SubscriptionId};
pub use target::{Asset, MultiResolutionAsset, RenderTarget, SingleResolutionAsset};
