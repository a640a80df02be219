#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, RawDetection};
use crate::frame::Frame;

const INPUT_SIZE: usize = 640;
const PAD_VALUE: f32 = 114.0 / 255.0;
const MIN_SCORE: f32 = 0.25;
const IOU_THRESHOLD: f32 = 0.45;

const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// YOLOv8 ONNX detector run through tract.
///
/// Frames are letterboxed into a 640x640 input. The model output
/// `[1, 84, N]` holds `cx, cy, w, h` followed by 80 class scores per anchor;
/// boxes are mapped back to frame coordinates and de-duplicated per class.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

/// Scale and padding that map frame pixels into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn for_frame(width: u32, height: u32) -> Self {
        let size = INPUT_SIZE as f32;
        let scale = (size / width as f32).min(size / height as f32);
        Self {
            scale,
            pad_x: (size - width as f32 * scale) / 2.0,
            pad_y: (size - height as f32 * scale) / 2.0,
        }
    }

    fn to_frame(&self, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
        let x = (cx - self.pad_x) / self.scale;
        let y = (cy - self.pad_y) / self.scale;
        let (half_w, half_h) = (w / self.scale / 2.0, h / self.scale / 2.0);
        BoundingBox::new(x - half_w, y - half_h, x + half_w, y + half_h)
    }
}

impl TractBackend {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, INPUT_SIZE, INPUT_SIZE)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;
        Ok(Self { model })
    }

    fn build_input(&self, frame: &Frame, letterbox: Letterbox) -> Tensor {
        let pixels = frame.pixels();
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, INPUT_SIZE, INPUT_SIZE),
            |(_, channel, y, x)| {
                let src_x = (x as f32 - letterbox.pad_x) / letterbox.scale;
                let src_y = (y as f32 - letterbox.pad_y) / letterbox.scale;
                if src_x < 0.0 || src_y < 0.0 {
                    return PAD_VALUE;
                }
                let (src_x, src_y) = (src_x as usize, src_y as usize);
                if src_x >= width || src_y >= height {
                    return PAD_VALUE;
                }
                pixels[(src_y * width + src_x) * 3 + channel] as f32 / 255.0
            },
        );
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, letterbox: Letterbox) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output is not [1, 84, N]")?;
        let (_, rows, anchors) = view.dim();
        if rows != 4 + COCO_LABELS.len() {
            return Err(anyhow!("expected 84 output rows, got {}", rows));
        }

        let mut candidates = Vec::new();
        for i in 0..anchors {
            let (class, score) = (0..COCO_LABELS.len())
                .map(|c| (c, view[[0, 4 + c, i]]))
                .fold((0, f32::NEG_INFINITY), |best, cur| {
                    if cur.1 > best.1 {
                        cur
                    } else {
                        best
                    }
                });
            if score < MIN_SCORE {
                continue;
            }
            let bbox = letterbox.to_frame(
                view[[0, 0, i]],
                view[[0, 1, i]],
                view[[0, 2, i]],
                view[[0, 3, i]],
            );
            candidates.push((class, score, bbox));
        }
        Ok(non_max_suppression(candidates)
            .into_iter()
            .map(|(class, score, bbox)| RawDetection::new(COCO_LABELS[class], score, bbox))
            .collect())
    }
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = w * h;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy per-class suppression, highest score first.
fn non_max_suppression(
    mut candidates: Vec<(usize, f32, BoundingBox)>,
) -> Vec<(usize, f32, BoundingBox)> {
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut kept: Vec<(usize, f32, BoundingBox)> = Vec::new();
    for cand in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.0 == cand.0 && iou(&k.2, &cand.2) > IOU_THRESHOLD);
        if !overlaps {
            kept.push(cand);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let letterbox = Letterbox::for_frame(frame.width(), frame.height());
        let input = self.build_input(frame, letterbox);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, letterbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_maps_model_centre_to_frame_centre() {
        let lb = Letterbox::for_frame(640, 480);
        assert_eq!(lb.scale, 1.0);
        assert_eq!(lb.pad_y, 80.0);
        let bbox = lb.to_frame(320.0, 320.0, 64.0, 32.0);
        assert_eq!(bbox, BoundingBox::new(288.0, 224.0, 352.0, 256.0));
    }

    #[test]
    fn suppression_is_per_class() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(5.0, 5.0, 100.0, 100.0);
        let kept = non_max_suppression(vec![(0, 0.6, b), (0, 0.9, a), (2, 0.7, b)]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].1, 0.9);
        assert_eq!(kept[1].0, 2);
    }
}
