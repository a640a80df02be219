//! Synthetic `stub://` source painting the shared street scene.

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, SourceStats};
use crate::config::SourceSettings;
use crate::frame::Frame;
use crate::scene;

pub struct SyntheticSource {
    url: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
    connected: bool,
}

impl SyntheticSource {
    /// Accepts `stub://name` with an optional `?frames=N` end-of-stream limit.
    pub fn new(settings: &SourceSettings) -> Result<Self> {
        let rest = settings
            .url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("not a stub url: {}", settings.url))?;
        let frame_limit = match rest.split_once('?') {
            Some((_, query)) => Some(parse_frame_limit(query)?),
            None => None,
        };
        Ok(Self {
            url: settings.url.clone(),
            width: settings.width,
            height: settings.height,
            frame_limit,
            frame_count: 0,
            connected: false,
        })
    }
}

fn parse_frame_limit(query: &str) -> Result<u64> {
    let value = query
        .strip_prefix("frames=")
        .ok_or_else(|| anyhow!("unsupported stub query '{}'", query))?;
    value
        .parse()
        .with_context(|| format!("invalid frame limit '{}'", value))
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("SyntheticSource: connected to {}", self.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source not connected"));
        }
        if self
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        let sequence = self.frame_count;
        let objects = scene::objects_at(sequence, self.width, self.height);
        let pixels = scene::render(&objects, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, sequence)?;
        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> SourceSettings {
        SourceSettings {
            url: url.to_string(),
            target_fps: 10,
            width: 32,
            height: 24,
        }
    }

    #[test]
    fn frames_are_sequenced_from_zero() -> Result<()> {
        let mut source = SyntheticSource::new(&settings("stub://test"))?;
        source.connect()?;
        let first = source.next_frame()?.context("first frame")?;
        let second = source.next_frame()?.context("second frame")?;
        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
        assert_eq!(first.pixels().len(), 32 * 24 * 3);
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn frame_limit_ends_stream() -> Result<()> {
        let mut source = SyntheticSource::new(&settings("stub://test?frames=2"))?;
        source.connect()?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn read_before_connect_fails() -> Result<()> {
        let mut source = SyntheticSource::new(&settings("stub://test"))?;
        assert!(source.next_frame().is_err());
        assert!(!source.is_healthy());
        Ok(())
    }

    #[test]
    fn bad_query_is_rejected() {
        assert!(SyntheticSource::new(&settings("stub://test?fps=3")).is_err());
        assert!(SyntheticSource::new(&settings("stub://test?frames=x")).is_err());
    }
}
