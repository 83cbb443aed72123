//! # vantage-core
//!
//! Core types and primitives for the Vantage viewport renderer.
//! This crate contains the foundational types shared across all Vantage
//! crates: pixel buffers, rendered frames, content fingerprints, frame
//! pacing, configuration and error types.

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod time;

pub use config::{RendererConfig, VantageConfig};
pub use error::{VantageError, VantageResult};
pub use frame::{FrameBuffer, PixelFormat, RenderedFrame};
pub use hash::Fingerprint;
pub use time::FramePacer;
