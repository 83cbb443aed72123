//! Content fingerprints for change detection.
//!
//! A static render target reports a fingerprint of its current content; the
//! render loop compares it against the last observed value to decide whether
//! a new frame is needed. Fingerprints are derived from SHA-256 digests and
//! truncated to 64 bits.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// A 64-bit content fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Build a fingerprint from the first eight bytes of a SHA-256 digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Fingerprint(u64::from_le_bytes(bytes))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Fingerprint(value)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Fingerprint a frame buffer's pixels together with its geometry.
pub fn fingerprint_frame(frame: &FrameBuffer) -> Fingerprint {
    let mut hasher = Sha256::new();
    // Dimensions are part of the content: a 2x8 and a 4x4 buffer with
    // identical bytes must not collide.
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update([frame.format as u8]);
    hasher.update(&frame.data);
    let digest: [u8; 32] = hasher.finalize().into();
    Fingerprint::from_digest(&digest)
}

/// Fingerprint a raw pixel buffer described by its geometry.
pub fn fingerprint_pixels(width: u32, height: u32, data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(data);
    let digest: [u8; 32] = hasher.finalize().into();
    Fingerprint::from_digest(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        let b = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        assert_eq!(fingerprint_frame(&a), fingerprint_frame(&b));
    }

    #[test]
    fn test_fingerprint_different_content() {
        let a = FrameBuffer::solid(10, 10, [255, 0, 0, 255]);
        let b = FrameBuffer::solid(10, 10, [0, 0, 255, 255]);
        assert_ne!(fingerprint_frame(&a), fingerprint_frame(&b));
    }

    #[test]
    fn test_fingerprint_different_shape() {
        let a = FrameBuffer::solid(2, 8, [9, 9, 9, 9]);
        let b = FrameBuffer::solid(4, 4, [9, 9, 9, 9]);
        assert_eq!(a.data, b.data);
        assert_ne!(fingerprint_frame(&a), fingerprint_frame(&b));
        assert_ne!(
            fingerprint_pixels(2, 8, &a.data),
            fingerprint_pixels(4, 4, &b.data)
        );
    }

    #[test]
    fn test_fingerprint_display_is_hex() {
        assert_eq!(Fingerprint(0xff).to_string(), "00000000000000ff");
    }
}
