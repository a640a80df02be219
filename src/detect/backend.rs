use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps an external object detector. It receives one frame at a
/// time and returns every object instance it found, in the detector's own
/// label vocabulary and pixel coordinates. Filtering, translation and
/// spatial reasoning happen downstream; backends must not pre-filter by
/// allow-list so the filter stays the single point of policy.
///
/// `detect` may block for the duration of inference. An `Err` is treated as
/// a transient failure for that frame only.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, called once before the loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
