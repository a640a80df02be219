//! Announcement text and the throttle-to-dispatcher hand-off.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Instant;

use crate::spatial::{ClassifiedDetection, DistanceBucket, Zone};
use crate::speech::{DispatchOutcome, SpeechDispatcher, SpeechEngine};
use crate::throttle::{SharedThrottle, ThrottleDecision};

/// Locale words for distance buckets and zones.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Phrases {
    pub very_close: String,
    pub close: String,
    pub far: String,
    pub left: String,
    pub center: String,
    pub right: String,
}

impl Default for Phrases {
    fn default() -> Self {
        Self {
            very_close: "muito proximo".to_string(),
            close: "proximo".to_string(),
            far: "distante".to_string(),
            left: "esquerda".to_string(),
            center: "frente".to_string(),
            right: "direita".to_string(),
        }
    }
}

impl Phrases {
    pub fn distance(&self, bucket: DistanceBucket) -> &str {
        match bucket {
            DistanceBucket::VeryClose => &self.very_close,
            DistanceBucket::Close => &self.close,
            DistanceBucket::Far => &self.far,
        }
    }

    pub fn zone(&self, zone: Zone) -> &str {
        match zone {
            Zone::Left => &self.left,
            Zone::Center => &self.center,
            Zone::Right => &self.right,
        }
    }

    /// `"{display_label} {distance} {zone}"`.
    pub fn compose(&self, detection: &ClassifiedDetection) -> String {
        format!(
            "{} {} {}",
            detection.display_label(),
            self.distance(detection.distance()),
            self.zone(detection.zone())
        )
    }

    pub fn validate(&self) -> Result<()> {
        let words = [
            ("very_close", &self.very_close),
            ("close", &self.close),
            ("far", &self.far),
            ("left", &self.left),
            ("center", &self.center),
            ("right", &self.right),
        ];
        for (key, word) in words {
            if word.trim().is_empty() {
                return Err(anyhow!("phrase '{}' must not be empty", key));
            }
        }
        Ok(())
    }
}

/// What happened to a candidate message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Accepted by the throttle and handed to the speech worker.
    Dispatched { text: String },
    /// Dropped by the throttle. Not retried.
    Throttled {
        text: String,
        decision: ThrottleDecision,
    },
    /// Accepted, but the dispatcher refused the hand-off.
    Refused {
        text: String,
        outcome: DispatchOutcome,
    },
}

/// Throttle and dispatcher bound together.
pub struct Announcer {
    throttle: SharedThrottle,
    dispatcher: SpeechDispatcher,
}

impl Announcer {
    pub fn new(throttle: SharedThrottle, engine: Box<dyn SpeechEngine>) -> Result<Self> {
        let dispatcher = SpeechDispatcher::spawn(engine, throttle.clone())?;
        Ok(Self {
            throttle,
            dispatcher,
        })
    }

    pub fn throttle(&self) -> &SharedThrottle {
        &self.throttle
    }

    pub fn announce(&self, text: String, now: Instant) -> AnnounceOutcome {
        let decision = self.throttle.try_acquire(now);
        if !decision.is_accepted() {
            log::debug!("throttle: dropped \"{}\" ({:?})", text, decision);
            return AnnounceOutcome::Throttled { text, decision };
        }
        match self.dispatcher.dispatch(text.clone()) {
            DispatchOutcome::Dispatched => {
                log::info!("announce: {}", text);
                AnnounceOutcome::Dispatched { text }
            }
            outcome => {
                self.throttle.release();
                log::warn!("speech hand-off refused for \"{}\": {:?}", text, outcome);
                AnnounceOutcome::Refused { text, outcome }
            }
        }
    }

    /// Stop the speech worker after the in-flight utterance.
    pub fn shutdown(self) {
        self.dispatcher.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, RawDetection};
    use crate::filter::{AllowList, DetectionFilter};
    use crate::frame::FrameGeometry;
    use crate::spatial::{DistanceThresholds, SpatialClassifier, ZoneBoundaries};
    use crate::speech::ConsoleEngine;
    use std::time::Duration;

    #[test]
    fn compose_uses_template_and_locale_words() {
        let filter = DetectionFilter::new(0.5, AllowList::new().with("person", "pessoa"));
        let classifier = SpatialClassifier::new(
            ZoneBoundaries::new(0.33, 0.66).unwrap(),
            DistanceThresholds::new(0.2, 0.05).unwrap(),
        );
        let raw = RawDetection::new("person", 0.9, BoundingBox::new(0.0, 100.0, 128.0, 244.0));
        let det = classifier.classify(
            filter.admit(&raw).unwrap(),
            FrameGeometry::new(640, 480).unwrap(),
        );
        assert_eq!(Phrases::default().compose(&det), "pessoa proximo esquerda");

        let english = Phrases {
            very_close: "very close".into(),
            close: "close".into(),
            far: "far".into(),
            left: "left".into(),
            center: "ahead".into(),
            right: "right".into(),
        };
        assert_eq!(english.compose(&det), "pessoa close left");
    }

    #[test]
    fn empty_phrase_is_invalid() {
        let phrases = Phrases {
            center: " ".into(),
            ..Phrases::default()
        };
        assert!(phrases.validate().is_err());
        assert!(Phrases::default().validate().is_ok());
    }

    #[test]
    fn refused_hand_off_returns_throttle_to_idle() {
        let throttle = SharedThrottle::new(Duration::from_secs(3));
        let announcer = Announcer {
            throttle: throttle.clone(),
            dispatcher: SpeechDispatcher::stopped(),
        };
        match announcer.announce("bicicleta proximo frente".into(), Instant::now()) {
            AnnounceOutcome::Refused { text, outcome } => {
                assert_eq!(text, "bicicleta proximo frente");
                assert_eq!(outcome, DispatchOutcome::WorkerGone);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!throttle.is_speaking());
        assert!(throttle.snapshot().last_announcement.is_some());
    }

    #[test]
    fn announcer_drops_during_cooldown() {
        let throttle = SharedThrottle::new(Duration::from_secs(3));
        let announcer = Announcer::new(throttle.clone(), Box::new(ConsoleEngine::new())).unwrap();
        let t0 = Instant::now();
        assert!(matches!(
            announcer.announce("a".into(), t0),
            AnnounceOutcome::Dispatched { .. }
        ));
        assert!(throttle.wait_until_idle(Duration::from_secs(5)));
        match announcer.announce("b".into(), t0 + Duration::from_secs(1)) {
            AnnounceOutcome::Throttled { text, decision } => {
                assert_eq!(text, "b");
                assert!(matches!(decision, ThrottleDecision::CoolingDown { .. }));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        announcer.shutdown();
    }
}
