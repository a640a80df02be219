//! Spatial classification of filtered detections.
//!
//! The frame is split into three vertical strips by two boundary ratios,
//! and a detection's relative box area is bucketed by two cut points.
//! Both rules use strict inequalities: a centre exactly on a zone boundary
//! is `Center`, and an area ratio exactly on a cut point falls into the
//! lower (farther) bucket.

use anyhow::{anyhow, Result};
use std::fmt;

use crate::filter::Detection;
use crate::frame::FrameGeometry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Zone {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistanceBucket {
    VeryClose,
    Close,
    Far,
}

impl DistanceBucket {
    /// Far objects are never announced.
    pub fn is_announceable(self) -> bool {
        matches!(self, DistanceBucket::VeryClose | DistanceBucket::Close)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Left => "left",
            Zone::Center => "center",
            Zone::Right => "right",
        })
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DistanceBucket::VeryClose => "very_close",
            DistanceBucket::Close => "close",
            DistanceBucket::Far => "far",
        })
    }
}

/// Horizontal zone boundaries as fractions of frame width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneBoundaries {
    left: f32,
    right: f32,
}

impl ZoneBoundaries {
    /// Requires `0 < left < right < 1`.
    pub fn new(left: f32, right: f32) -> Result<Self> {
        if !(left.is_finite() && right.is_finite()) || !(0.0 < left && left < right && right < 1.0)
        {
            return Err(anyhow!(
                "zone boundaries must satisfy 0 < left < right < 1 (got left={}, right={})",
                left,
                right
            ));
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn zone_for(&self, center_x: f32, frame_width: f32) -> Zone {
        if center_x < frame_width * self.left {
            Zone::Left
        } else if center_x > frame_width * self.right {
            Zone::Right
        } else {
            Zone::Center
        }
    }
}

impl Default for ZoneBoundaries {
    fn default() -> Self {
        Self {
            left: 0.33,
            right: 0.66,
        }
    }
}

/// Area-ratio cut points: above `high` is very close, above `low` is close.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceThresholds {
    high: f32,
    low: f32,
}

impl DistanceThresholds {
    /// Requires `0 < low < high <= 1`.
    pub fn new(high: f32, low: f32) -> Result<Self> {
        if !(high.is_finite() && low.is_finite()) || !(0.0 < low && low < high && high <= 1.0) {
            return Err(anyhow!(
                "distance thresholds must satisfy 0 < low < high <= 1 (got high={}, low={})",
                high,
                low
            ));
        }
        Ok(Self { high, low })
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn bucket_for(&self, area_ratio: f32) -> DistanceBucket {
        if area_ratio > self.high {
            DistanceBucket::VeryClose
        } else if area_ratio > self.low {
            DistanceBucket::Close
        } else {
            DistanceBucket::Far
        }
    }
}

impl Default for DistanceThresholds {
    fn default() -> Self {
        Self {
            high: 0.3,
            low: 0.1,
        }
    }
}

/// A detection with its derived zone and distance.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedDetection {
    detection: Detection,
    area_ratio: f32,
    zone: Zone,
    distance: DistanceBucket,
}

impl ClassifiedDetection {
    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    pub fn display_label(&self) -> &str {
        self.detection.display_label()
    }

    pub fn area_ratio(&self) -> f32 {
        self.area_ratio
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn distance(&self) -> DistanceBucket {
        self.distance
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SpatialClassifier {
    zones: ZoneBoundaries,
    distance: DistanceThresholds,
}

impl SpatialClassifier {
    pub fn new(zones: ZoneBoundaries, distance: DistanceThresholds) -> Self {
        Self { zones, distance }
    }

    pub fn classify(&self, detection: Detection, geometry: FrameGeometry) -> ClassifiedDetection {
        let bbox = detection.bbox();
        let zone = self
            .zones
            .zone_for(bbox.center_x(), geometry.width() as f32);
        // Boxes overhanging the frame edge must not push the ratio past 1.
        let area_ratio = (bbox.area() / geometry.area()).min(1.0);
        let distance = self.distance.bucket_for(area_ratio);
        ClassifiedDetection {
            detection,
            area_ratio,
            zone,
            distance,
        }
    }

    /// Classify every detection of a frame, preserving order.
    pub fn classify_all(
        &self,
        detections: Vec<Detection>,
        geometry: FrameGeometry,
    ) -> Vec<ClassifiedDetection> {
        detections
            .into_iter()
            .map(|det| self.classify(det, geometry))
            .collect()
    }

    /// Frame-level entry point for callers holding bare dimensions.
    pub fn classify_frame(
        &self,
        detections: Vec<Detection>,
        width: u32,
        height: u32,
    ) -> Result<Vec<ClassifiedDetection>> {
        let geometry = FrameGeometry::new(width, height)?;
        Ok(self.classify_all(detections, geometry))
    }
}
