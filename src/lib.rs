//! Voice Scout
//!
//! Turns a camera feed into short spoken announcements about nearby
//! obstacles, for pedestrians with low vision.
//!
//! # Pipeline
//!
//! Every detection cycle runs one frame through:
//!
//! 1. **Filter** (`filter`): drop low-confidence, unlisted or malformed
//!    detections and translate labels to display words.
//! 2. **Spatial classifier** (`spatial`): left/center/right zone and
//!    very close/close/far distance bucket.
//! 3. **Priority selector** (`priority`): the largest close object wins.
//! 4. **Throttle** (`throttle`): at most one message per cooldown window,
//!    never while speaking.
//! 5. **Speech dispatcher** (`speech`): one worker thread, one utterance at
//!    a time.
//!
//! # Module Structure
//!
//! - `frame`: owned RGB frames and validated geometry
//! - `ingest`: frame sources (synthetic stub, V4L2)
//! - `detect`: detector backends and their registry
//! - `announce`: message text and the throttle/dispatcher hand-off
//! - `pipeline`: the per-frame cycle and the capture loop
//! - `config`: file and environment configuration

pub mod announce;
pub mod config;
pub mod detect;
pub mod filter;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod priority;
pub mod scene;
pub mod spatial;
pub mod speech;
pub mod throttle;

pub use announce::{AnnounceOutcome, Announcer, Phrases};
pub use config::{AssistantConfig, DetectorSettings, SourceSettings, SpeechSettings};
pub use detect::{BackendRegistry, BoundingBox, DetectorBackend, RawDetection};
pub use filter::{AllowList, Detection, DetectionFilter, DropReason};
pub use frame::{Frame, FrameGeometry};
pub use ingest::{open_source, FrameSource, SourceStats};
pub use pipeline::{Assistant, CycleOutcome, RunOptions, RunSummary, StopReason};
pub use priority::select_most_salient;
pub use spatial::{
    ClassifiedDetection, DistanceBucket, DistanceThresholds, SpatialClassifier, Zone,
    ZoneBoundaries,
};
pub use speech::{build_engine, DispatchOutcome, SpeechDispatcher, SpeechEngine, SpeechError};
pub use throttle::{SharedThrottle, ThrottleDecision, ThrottleState};
