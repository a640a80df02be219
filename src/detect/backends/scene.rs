use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::Frame;
use crate::scene;

/// Reports the synthetic scene the `stub://` source paints.
#[derive(Debug, Default)]
pub struct SceneBackend;

impl SceneBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for SceneBackend {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        Ok(scene::objects_at(frame.sequence(), frame.width(), frame.height())
            .iter()
            .map(scene::SceneObject::to_detection)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_scene_objects_for_frame() {
        let frame = Frame::new(vec![0; 64 * 48 * 3], 64, 48, 0).unwrap();
        let labels: Vec<String> = SceneBackend::new()
            .detect(&frame)
            .unwrap()
            .into_iter()
            .map(|det| det.label)
            .collect();
        assert_eq!(labels, vec!["person", "car", "dog"]);
    }
}
