//! Deterministic street scene shared by the `stub://` source and the
//! `scene` detector, so the full loop runs without camera or model.

use crate::detect::{BoundingBox, RawDetection};

#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    pub label: &'static str,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub color: [u8; 3],
}

impl SceneObject {
    pub fn to_detection(&self) -> RawDetection {
        RawDetection::new(self.label, self.confidence, self.bbox)
    }
}

/// Objects visible on frame `sequence` of a `width` x `height` scene.
pub fn objects_at(sequence: u64, width: u32, height: u32) -> Vec<SceneObject> {
    let f = sequence as f32;
    let w = width as f32;
    let h = height as f32;
    let mut objects = Vec::with_capacity(4);

    // Person swaying near the left edge and walking towards the camera.
    let person_cx = w * (0.15 + 0.08 * (f * 0.05).sin());
    let person_w = w * (0.18 + 0.12 * (f * 0.02).sin());
    let person_h = (person_w * 2.2).min(h);
    let floor = h * 0.95;
    objects.push(SceneObject {
        label: "person",
        confidence: 0.88,
        bbox: BoundingBox::new(
            (person_cx - person_w / 2.0).max(0.0),
            (floor - person_h).max(0.0),
            person_cx + person_w / 2.0,
            floor,
        ),
        color: [200, 60, 60],
    });

    if (sequence / 30) % 3 == 0 {
        objects.push(SceneObject {
            label: "car",
            confidence: 0.8,
            bbox: BoundingBox::new(w * 0.56, h * 0.45, w * 0.94, h * 0.85),
            color: [60, 60, 200],
        });
    }

    if (sequence / 20) % 4 == 1 {
        let bike_cx = w * (0.45 + 0.05 * (f * 0.03).cos());
        let bike_w = w * 0.25;
        objects.push(SceneObject {
            label: "bicycle",
            confidence: 0.62,
            bbox: BoundingBox::new(
                bike_cx - bike_w / 2.0,
                h * 0.4,
                bike_cx + bike_w / 2.0,
                h * 0.85,
            ),
            color: [60, 200, 60],
        });
    }

    // Not on the default allow-list.
    objects.push(SceneObject {
        label: "dog",
        confidence: 0.71,
        bbox: BoundingBox::new(w * 0.7, h * 0.75, w * 0.85, h * 0.95),
        color: [160, 120, 40],
    });

    objects
}

/// Paint `objects` as filled rectangles onto a grey RGB canvas.
pub fn render(objects: &[SceneObject], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let mut data = vec![96u8; w * h * 3];
    for obj in objects {
        let x1 = (obj.bbox.x1.max(0.0) as usize).min(w);
        let x2 = (obj.bbox.x2.max(0.0) as usize).min(w);
        let y1 = (obj.bbox.y1.max(0.0) as usize).min(h);
        let y2 = (obj.bbox.y2.max(0.0) as usize).min(h);
        for y in y1..y2 {
            let row = y * w * 3;
            for x in x1..x2 {
                let px = row + x * 3;
                data[px..px + 3].copy_from_slice(&obj.color);
            }
        }
    }
    data
}
