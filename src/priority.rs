//! Priority selection: at most one detection per cycle.

use crate::spatial::ClassifiedDetection;

/// Pick the announceable detection with the largest area ratio.
///
/// Only `VeryClose` and `Close` detections qualify. Ties go to the earliest
/// detection in input order, so the choice is stable for identical input.
pub fn select_most_salient(detections: &[ClassifiedDetection]) -> Option<&ClassifiedDetection> {
    detections
        .iter()
        .filter(|det| det.distance().is_announceable())
        .fold(None, |best: Option<&ClassifiedDetection>, det| match best {
            Some(current) if det.area_ratio() <= current.area_ratio() => Some(current),
            _ => Some(det),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, RawDetection};
    use crate::filter::{AllowList, DetectionFilter};
    use crate::frame::FrameGeometry;
    use crate::spatial::{DistanceBucket, DistanceThresholds, SpatialClassifier, ZoneBoundaries};

    const W: f32 = 640.0;
    const H: f32 = 480.0;

    /// Classify boxes given as (label, area ratio, left edge). Height is the full frame.
    fn classify(specs: &[(&str, f32, f32)]) -> Vec<ClassifiedDetection> {
        let allow = AllowList::new()
            .with("person", "pessoa")
            .with("car", "carro")
            .with("bench", "banco");
        let filter = DetectionFilter::new(0.5, allow);
        let classifier = SpatialClassifier::new(
            ZoneBoundaries::new(0.33, 0.66).unwrap(),
            DistanceThresholds::new(0.2, 0.05).unwrap(),
        );
        let raw: Vec<_> = specs
            .iter()
            .map(|(label, ratio, x1)| {
                let width = ratio * W;
                RawDetection::new(*label, 0.9, BoundingBox::new(*x1, 0.0, x1 + width, H))
            })
            .collect();
        classifier.classify_all(filter.apply(&raw), FrameGeometry::new(640, 480).unwrap())
    }

    #[test]
    fn largest_area_wins() {
        let dets = classify(&[("car", 0.12, 0.0), ("person", 0.25, 100.0)]);
        let chosen = select_most_salient(&dets).unwrap();
        assert_eq!(chosen.display_label(), "pessoa");
        assert_eq!(chosen.distance(), DistanceBucket::VeryClose);
    }

    #[test]
    fn ties_go_to_first_occurrence() {
        let dets = classify(&[("car", 0.125, 0.0), ("person", 0.125, 320.0)]);
        assert_eq!(dets[0].area_ratio(), dets[1].area_ratio());
        let chosen = select_most_salient(&dets).unwrap();
        assert_eq!(chosen.display_label(), "carro");
    }

    #[test]
    fn far_detections_never_qualify() {
        let dets = classify(&[("car", 0.01, 0.0), ("bench", 0.04, 200.0)]);
        assert!(dets.iter().all(|d| d.distance() == DistanceBucket::Far));
        assert!(select_most_salient(&dets).is_none());
    }

    #[test]
    fn mixed_buckets_pick_the_close_object() {
        let dets = classify(&[("bench", 0.03, 0.0), ("person", 0.08, 300.0)]);
        let chosen = select_most_salient(&dets).unwrap();
        assert_eq!(chosen.display_label(), "pessoa");
        assert_eq!(chosen.distance(), DistanceBucket::Close);
    }

    #[test]
    fn empty_input_yields_no_candidate() {
        assert!(select_most_salient(&[]).is_none());
    }
}
