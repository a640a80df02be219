//! Detection filter.
//!
//! Turns raw detector output into `Detection` records. A detection survives
//! only when its confidence is strictly above the threshold, its label is
//! in the allow-list, and its values are well formed. The allow-list doubles
//! as the translation table: a surviving detection always carries the
//! display label the allow-list maps it to.
//!
//! `Detection` has no public constructor, so the only way to obtain one is
//! through `DetectionFilter::apply`:
//!
//! ```compile_fail
//! use voice_scout::{BoundingBox, Detection};
//!
//! let det = Detection {
//!     raw_label: "person".to_string(),
//!     display_label: "pessoa".to_string(),
//!     confidence: 0.9,
//!     bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
//! };
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::detect::{BoundingBox, RawDetection};

/// Detector label → display label. Absent labels are ignored entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    entries: BTreeMap<String, String>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, raw_label: &str, display_label: &str) -> Self {
        self.insert(raw_label, display_label);
        self
    }

    pub fn insert(&mut self, raw_label: &str, display_label: &str) {
        self.entries
            .insert(raw_label.to_string(), display_label.to_string());
    }

    pub fn display_label(&self, raw_label: &str) -> Option<&str> {
        self.entries.get(raw_label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for AllowList {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (raw, display) in iter {
            list.insert(raw, display);
        }
        list
    }
}

/// An allow-listed, validated detection for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    raw_label: String,
    display_label: String,
    confidence: f32,
    bbox: BoundingBox,
}

impl Detection {
    pub fn raw_label(&self) -> &str {
        &self.raw_label
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }
}

/// Why a raw detection was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    LowConfidence,
    NotAllowed,
}

#[derive(Clone, Debug)]
pub struct DetectionFilter {
    confidence_threshold: f32,
    allow_list: AllowList,
}

impl DetectionFilter {
    pub fn new(confidence_threshold: f32, allow_list: AllowList) -> Self {
        Self {
            confidence_threshold,
            allow_list,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Filter one frame's raw detections, preserving input order.
    pub fn apply(&self, raw: &[RawDetection]) -> Vec<Detection> {
        raw.iter()
            .filter_map(|det| match self.admit(det) {
                Ok(admitted) => Some(admitted),
                Err(reason) => {
                    log::trace!(
                        "filter: dropped {} ({:?}, conf={:.2})",
                        det.label,
                        reason,
                        det.confidence
                    );
                    None
                }
            })
            .collect()
    }

    /// Judge a single raw detection.
    pub fn admit(&self, det: &RawDetection) -> Result<Detection, DropReason> {
        if !det.confidence.is_finite()
            || !(0.0..=1.0).contains(&det.confidence)
            || !det.bbox.is_well_formed()
        {
            return Err(DropReason::Malformed);
        }
        if det.confidence <= self.confidence_threshold {
            return Err(DropReason::LowConfidence);
        }
        let display_label = self
            .allow_list
            .display_label(&det.label)
            .ok_or(DropReason::NotAllowed)?;
        Ok(Detection {
            raw_label: det.label.clone(),
            display_label: display_label.to_string(),
            confidence: det.confidence,
            bbox: det.bbox,
        })
    }
}
