//! Render targets: the displayable assets the render loop turns into frames.
//!
//! An asset advertises what it can do through the trait it implements;
//! [`RenderTarget`] closes over the supported capability sets so the loop can
//! dispatch without inspecting concrete types.

use vantage_core::{Fingerprint, FrameBuffer, VantageError, VantageResult};

use crate::convert::{self, Bitmap};

/// Capabilities shared by every render target.
pub trait Asset: Send {
    /// Static assets only change through explicit edits; their fingerprint is
    /// used to skip re-rendering identical content.
    fn is_static(&self) -> bool;

    /// Summary of the current content. Only consulted for static assets.
    fn fingerprint(&self) -> Fingerprint;

    /// Release resources held by the asset. Called exactly once, when the
    /// renderer lets go of it.
    fn dispose(&mut self) -> VantageResult<()> {
        Ok(())
    }

    /// Short human-readable label used in logs.
    fn label(&self) -> String {
        "asset".to_string()
    }
}

/// An asset with several precomputed resolutions; detail 0 is the finest.
pub trait MultiResolutionAsset: Asset {
    /// Number of available detail levels. Valid indices are
    /// `0..max_detail_index()`.
    fn max_detail_index(&self) -> u32;

    fn bitmap_at_detail(&mut self, level: u32) -> VantageResult<Bitmap>;
}

/// An asset with a single fixed resolution.
pub trait SingleResolutionAsset: Asset {
    fn bitmap(&mut self) -> VantageResult<Bitmap>;
}

/// The asset currently installed in a renderer.
pub enum RenderTarget {
    MultiResolution(Box<dyn MultiResolutionAsset>),
    SingleResolution(Box<dyn SingleResolutionAsset>),
    /// An asset that exposes no pixel access the renderer understands.
    Opaque(Box<dyn Asset>),
}

/// Output of one production attempt.
#[derive(Debug)]
pub struct Production {
    pub buffer: FrameBuffer,
    /// Resolved detail level, for multi-resolution targets.
    pub detail_level: Option<u32>,
}

/// Resolve a requested quality level against the number of detail levels an
/// asset offers. Requests past the end clamp to the coarsest level.
pub fn clamp_detail(requested: u32, max_detail_index: u32) -> Option<u32> {
    if max_detail_index == 0 {
        return None;
    }
    Some(requested.min(max_detail_index - 1))
}

impl RenderTarget {
    pub fn multi_resolution(asset: impl MultiResolutionAsset + 'static) -> Self {
        RenderTarget::MultiResolution(Box::new(asset))
    }

    pub fn single_resolution(asset: impl SingleResolutionAsset + 'static) -> Self {
        RenderTarget::SingleResolution(Box::new(asset))
    }

    pub fn opaque(asset: impl Asset + 'static) -> Self {
        RenderTarget::Opaque(Box::new(asset))
    }

    pub fn is_static(&self) -> bool {
        match self {
            RenderTarget::MultiResolution(a) => a.is_static(),
            RenderTarget::SingleResolution(a) => a.is_static(),
            RenderTarget::Opaque(a) => a.is_static(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            RenderTarget::MultiResolution(a) => a.fingerprint(),
            RenderTarget::SingleResolution(a) => a.fingerprint(),
            RenderTarget::Opaque(a) => a.fingerprint(),
        }
    }

    pub fn dispose(&mut self) -> VantageResult<()> {
        match self {
            RenderTarget::MultiResolution(a) => a.dispose(),
            RenderTarget::SingleResolution(a) => a.dispose(),
            RenderTarget::Opaque(a) => a.dispose(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RenderTarget::MultiResolution(a) => a.label(),
            RenderTarget::SingleResolution(a) => a.label(),
            RenderTarget::Opaque(a) => a.label(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderTarget::MultiResolution(_) => "multi-resolution",
            RenderTarget::SingleResolution(_) => "single-resolution",
            RenderTarget::Opaque(_) => "opaque",
        }
    }

    /// The detail level a request would be produced at, if the target has
    /// levels at all.
    pub fn resolve_detail(&self, requested: u32) -> Option<u32> {
        match self {
            RenderTarget::MultiResolution(a) => clamp_detail(requested, a.max_detail_index()),
            _ => None,
        }
    }

    /// Produce a frame buffer at the requested quality level.
    pub fn produce(&mut self, requested: u32) -> VantageResult<Production> {
        let resolved = self.resolve_detail(requested);
        match self {
            RenderTarget::MultiResolution(asset) => {
                let level = resolved.ok_or_else(|| {
                    VantageError::UnsupportedRenderTarget(format!(
                        "{} exposes no detail levels",
                        asset.label()
                    ))
                })?;
                let bitmap = asset.bitmap_at_detail(level)?;
                Ok(Production {
                    buffer: convert::to_frame_buffer(bitmap)?,
                    detail_level: Some(level),
                })
            }
            RenderTarget::SingleResolution(asset) => {
                let bitmap = asset.bitmap()?;
                Ok(Production {
                    buffer: convert::to_frame_buffer(bitmap)?,
                    detail_level: None,
                })
            }
            RenderTarget::Opaque(asset) => Err(VantageError::UnsupportedRenderTarget(format!(
                "{} has no pixel access",
                asset.label()
            ))),
        }
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("kind", &self.kind())
            .field("label", &self.label())
            .field("is_static", &self.is_static())
            .finish()
    }
}
