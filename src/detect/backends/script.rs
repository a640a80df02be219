use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

#[derive(Debug, Deserialize)]
struct ScriptFile {
    frames: Vec<ScriptFrame>,
}

#[derive(Debug, Deserialize)]
struct ScriptFrame {
    index: u64,
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// Replays recorded detections keyed by frame sequence number.
///
/// Frames with no entry yield no detections. Entries are returned verbatim,
/// malformed ones included, so recordings can exercise the filter.
#[derive(Debug, Default)]
pub struct ScriptBackend {
    frames: HashMap<u64, Vec<RawDetection>>,
}

impl ScriptBackend {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read detection script {}: {}", path.display(), e))?;
        Self::from_json(&raw)
            .map_err(|e| anyhow!("invalid detection script {}: {}", path.display(), e))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ScriptFile = serde_json::from_str(raw)?;
        let mut frames: HashMap<u64, Vec<RawDetection>> = HashMap::new();
        for frame in file.frames {
            frames.entry(frame.index).or_default().extend(frame.detections);
        }
        Ok(Self { frames })
    }

    pub fn scripted_frames(&self) -> usize {
        self.frames.len()
    }
}

impl DetectorBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        "script"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        Ok(self
            .frames
            .get(&frame.sequence())
            .cloned()
            .unwrap_or_default())
    }
}
