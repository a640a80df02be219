//! Frames handed from a source to a detector.
//!
//! - `Frame`: one captured RGB24 image. Pixels are private and only lent out
//!   as a borrowed slice for the duration of a detector call.
//! - `FrameGeometry`: validated, non-zero frame dimensions. Every spatial
//!   computation divides by these, so zero is rejected at construction.
//!
//! Frames carry no identity across cycles: the sequence number exists for
//! frame-skip scheduling and for replaying scripted detections, not for
//! tracking objects.
//!
//! ```compile_fail
//! use voice_scout::Frame;
//!
//! fn steal(frame: Frame) -> Vec<u8> {
//!     frame.data
//! }
//! ```

use anyhow::{anyhow, Result};

/// Non-zero frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "frame dimensions must be non-zero (got {}x{})",
                width,
                height
            ));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total pixel area as a float, for ratio computations.
    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// One captured RGB24 frame.
pub struct Frame {
    data: Vec<u8>,
    geometry: FrameGeometry,
    sequence: u64,
}

impl Frame {
    /// Wrap captured pixels. `data` must be exactly `width * height * 3` bytes.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let geometry = FrameGeometry::new(width, height)?;
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            geometry,
            sequence,
        })
    }

    /// Borrow the pixels (row-major RGB24).
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Monotonic index assigned by the source, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Pixel content stays out of logs.
        f.debug_struct("Frame")
            .field("width", &self.geometry.width)
            .field("height", &self.geometry.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}
