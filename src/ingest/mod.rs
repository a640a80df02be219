//! Frame ingestion sources.
//!
//! - `stub://name[?frames=N]`: synthetic street scene (always built)
//! - `/dev/videoN`: USB/V4L2 camera (feature: ingest-v4l2)
//!
//! Sources hand out owned `Frame`s one at a time. `Ok(None)` marks the end
//! of the stream; an `Err` is a single failed read and the caller decides
//! how many of those in a row it tolerates.

pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use anyhow::{anyhow, Result};

use crate::config::SourceSettings;
use crate::frame::Frame;

pub trait FrameSource {
    fn connect(&mut self) -> Result<()>;

    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

/// Select a source implementation from the configured URL.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    if settings.url.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(settings)?));
    }
    if settings.url.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(settings)));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(anyhow!(
                "source {} requires the ingest-v4l2 feature",
                settings.url
            ));
        }
    }
    Err(anyhow!("unsupported source url '{}'", settings.url))
}
