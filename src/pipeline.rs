//! The per-frame detection-to-announcement cycle and the capture loop.
//!
//! Each detection cycle runs filter, classifier and selector over one
//! frame's detections and offers at most one message to the throttle.
//! Nothing but the throttle survives from one cycle to the next.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::announce::{AnnounceOutcome, Announcer, Phrases};
use crate::config::AssistantConfig;
use crate::detect::{DetectorBackend, RawDetection};
use crate::filter::DetectionFilter;
use crate::frame::{Frame, FrameGeometry};
use crate::ingest::FrameSource;
use crate::priority::select_most_salient;
use crate::spatial::{ClassifiedDetection, SpatialClassifier};
use crate::speech::SpeechEngine;
use crate::throttle::SharedThrottle;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// What one frame produced.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Frame skipped by the detection interval.
    Skipped,
    /// The source failed to deliver a frame.
    ReadFailed(String),
    /// The detector failed on this frame.
    DetectFailed(String),
    /// No detection qualified for announcement.
    NoCandidate { considered: usize },
    Announcement(AnnounceOutcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    FrameLimit,
    EndOfStream,
    SourceFailed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub read_failures: u64,
    pub cycles_run: u64,
    pub detect_failures: u64,
    pub announcements: u64,
    pub throttled: u64,
    pub refused: u64,
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Skipped => {}
            CycleOutcome::ReadFailed(_) => self.read_failures += 1,
            CycleOutcome::DetectFailed(_) => {
                self.cycles_run += 1;
                self.detect_failures += 1;
            }
            CycleOutcome::NoCandidate { .. } => self.cycles_run += 1,
            CycleOutcome::Announcement(announcement) => {
                self.cycles_run += 1;
                match announcement {
                    AnnounceOutcome::Dispatched { .. } => self.announcements += 1,
                    AnnounceOutcome::Throttled { .. } => self.throttled += 1,
                    AnnounceOutcome::Refused { .. } => self.refused += 1,
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub max_frames: Option<u64>,
    /// Sleep between frames.
    pub frame_interval: Duration,
    /// Log every throttled message at info level.
    pub log_throttled: bool,
}

impl RunOptions {
    pub fn from_config(cfg: &AssistantConfig) -> Self {
        Self {
            max_frames: None,
            frame_interval: cfg.source.frame_interval(),
            log_throttled: true,
        }
    }
}

pub struct Assistant {
    filter: DetectionFilter,
    classifier: SpatialClassifier,
    phrases: Phrases,
    detection_interval: u64,
    startup_message: String,
    max_read_failures: u32,
    detector: Box<dyn DetectorBackend>,
    announcer: Announcer,
}

impl Assistant {
    pub fn new(
        cfg: &AssistantConfig,
        detector: Box<dyn DetectorBackend>,
        engine: Box<dyn SpeechEngine>,
    ) -> Result<Self> {
        let throttle = SharedThrottle::new(cfg.cooldown);
        Ok(Self {
            filter: DetectionFilter::new(cfg.confidence_threshold, cfg.allow_list.clone()),
            classifier: SpatialClassifier::new(cfg.zones, cfg.distance),
            phrases: cfg.phrases.clone(),
            detection_interval: u64::from(cfg.detection_interval.max(1)),
            startup_message: cfg.startup_message.clone(),
            max_read_failures: cfg.max_consecutive_read_failures.max(1),
            detector,
            announcer: Announcer::new(throttle, engine)?,
        })
    }

    pub fn throttle(&self) -> &SharedThrottle {
        self.announcer.throttle()
    }

    /// Filter then classify one frame's detections. No side effects.
    pub fn perceive(
        &self,
        raw: &[RawDetection],
        geometry: FrameGeometry,
    ) -> Vec<ClassifiedDetection> {
        self.classifier.classify_all(self.filter.apply(raw), geometry)
    }

    /// Pick the most salient detection and offer its message to the throttle.
    pub fn decide(
        &self,
        raw: &[RawDetection],
        geometry: FrameGeometry,
        now: Instant,
    ) -> CycleOutcome {
        let classified = self.perceive(raw, geometry);
        match select_most_salient(&classified) {
            Some(best) => {
                let text = self.phrases.compose(best);
                CycleOutcome::Announcement(self.announcer.announce(text, now))
            }
            None => CycleOutcome::NoCandidate {
                considered: classified.len(),
            },
        }
    }

    /// Run the detection cycle on frame `index` if the interval selects it.
    pub fn process_frame(&mut self, index: u64, frame: &Frame, now: Instant) -> CycleOutcome {
        if index % self.detection_interval != 0 {
            return CycleOutcome::Skipped;
        }
        let raw = match self.detector.detect(frame) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!(
                    "detector {} failed on frame {}: {:#}",
                    self.detector.name(),
                    frame.sequence(),
                    err
                );
                return CycleOutcome::DetectFailed(err.to_string());
            }
        };
        self.decide(&raw, frame.geometry(), now)
    }

    /// Offer the configured start-up message. `None` when it is empty.
    pub fn announce_startup(&self, now: Instant) -> Option<AnnounceOutcome> {
        if self.startup_message.trim().is_empty() {
            return None;
        }
        Some(self.announcer.announce(self.startup_message.clone(), now))
    }

    /// Read and process frames until shutdown, a frame limit, end of
    /// stream or too many consecutive read failures.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        options: &RunOptions,
        shutdown: &AtomicBool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut index: u64 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut last_health_log = Instant::now();

        let stop = loop {
            if shutdown.load(Ordering::SeqCst) {
                break StopReason::Shutdown;
            }
            if options.max_frames.is_some_and(|max| index >= max) {
                break StopReason::FrameLimit;
            }

            let outcome = match source.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_failures = 0;
                    summary.frames_read += 1;
                    let outcome = self.process_frame(index, &frame, Instant::now());
                    index += 1;
                    outcome
                }
                Ok(None) => break StopReason::EndOfStream,
                Err(err) => {
                    consecutive_failures += 1;
                    log::warn!(
                        "frame read failed ({}/{}): {:#}",
                        consecutive_failures,
                        self.max_read_failures,
                        err
                    );
                    CycleOutcome::ReadFailed(err.to_string())
                }
            };
            if options.log_throttled {
                if let CycleOutcome::Announcement(AnnounceOutcome::Throttled { text, .. }) =
                    &outcome
                {
                    log::info!("throttled: {}", text);
                }
            }
            summary.record(&outcome);

            if consecutive_failures >= self.max_read_failures {
                log::error!(
                    "source {} failed {} times in a row; stopping",
                    source.stats().url,
                    consecutive_failures
                );
                break StopReason::SourceFailed;
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = source.stats();
                log::debug!(
                    "health: source={} healthy={} captured={} frames_read={} cycles={} announcements={}",
                    stats.url,
                    source.is_healthy(),
                    stats.frames_captured,
                    summary.frames_read,
                    summary.cycles_run,
                    summary.announcements
                );
                last_health_log = Instant::now();
            }

            if !options.frame_interval.is_zero() {
                std::thread::sleep(options.frame_interval);
            }
        };

        summary.stop_reason = Some(stop);
        Ok(summary)
    }

    /// Let the in-flight utterance finish and stop the speech worker.
    pub fn shutdown(self) {
        self.announcer.shutdown();
    }
}
