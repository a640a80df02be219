use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::announce::Phrases;
use crate::filter::AllowList;
use crate::spatial::{DistanceThresholds, ZoneBoundaries};

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_COOLDOWN_SECS: u64 = 3;
const DEFAULT_DETECTION_INTERVAL: u32 = 3;
const DEFAULT_SOURCE_URL: &str = "stub://front";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_DETECTOR: &str = "scene";
const DEFAULT_SPEECH_ENGINE: &str = "console";
const DEFAULT_VOICE: &str = "pt-br";
const DEFAULT_RATE_WPM: u32 = 180;
const DEFAULT_STARTUP_MESSAGE: &str = "Assistente de acessibilidade ativado";
const DEFAULT_MAX_READ_FAILURES: u32 = 10;

const DEFAULT_ALLOW_LIST: &[(&str, &str)] = &[
    ("person", "pessoa"),
    ("car", "carro"),
    ("truck", "caminhao"),
    ("bus", "onibus"),
    ("bicycle", "bicicleta"),
    ("motorcycle", "moto"),
    ("traffic light", "semaforo"),
    ("stop sign", "placa de pare"),
    ("chair", "cadeira"),
    ("bench", "banco"),
];

#[derive(Debug, Deserialize, Default)]
struct AssistantConfigFile {
    confidence_threshold: Option<f32>,
    cooldown_secs: Option<f64>,
    detection_interval: Option<u32>,
    startup_message: Option<String>,
    max_consecutive_read_failures: Option<u32>,
    zones: Option<ZonesConfigFile>,
    distance: Option<DistanceConfigFile>,
    allow_list: Option<BTreeMap<String, String>>,
    phrases: Option<Phrases>,
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    speech: Option<SpeechConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ZonesConfigFile {
    left: Option<f32>,
    right: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DistanceConfigFile {
    high: Option<f32>,
    low: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    script_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct SpeechConfigFile {
    engine: Option<String>,
    voice: Option<String>,
    rate_wpm: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub confidence_threshold: f32,
    pub cooldown: Duration,
    pub detection_interval: u32,
    pub startup_message: String,
    pub max_consecutive_read_failures: u32,
    pub zones: ZoneBoundaries,
    pub distance: DistanceThresholds,
    pub allow_list: AllowList,
    pub phrases: Phrases,
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub engine: String,
    pub voice: String,
    pub rate_wpm: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            detection_interval: DEFAULT_DETECTION_INTERVAL,
            startup_message: DEFAULT_STARTUP_MESSAGE.to_string(),
            max_consecutive_read_failures: DEFAULT_MAX_READ_FAILURES,
            zones: ZoneBoundaries::default(),
            distance: DistanceThresholds::default(),
            allow_list: DEFAULT_ALLOW_LIST.iter().copied().collect(),
            phrases: Phrases::default(),
            source: SourceSettings {
                url: DEFAULT_SOURCE_URL.to_string(),
                target_fps: DEFAULT_SOURCE_FPS,
                width: DEFAULT_SOURCE_WIDTH,
                height: DEFAULT_SOURCE_HEIGHT,
            },
            detector: DetectorSettings {
                backend: DEFAULT_DETECTOR.to_string(),
                model_path: None,
                script_path: None,
            },
            speech: SpeechSettings {
                engine: DEFAULT_SPEECH_ENGINE.to_string(),
                voice: DEFAULT_VOICE.to_string(),
                rate_wpm: DEFAULT_RATE_WPM,
            },
        }
    }
}

impl AssistantConfig {
    /// Load from `SCOUT_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCOUT_CONFIG").ok();
        Self::load_with(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(Some(path))
    }

    fn load_with(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AssistantConfigFile) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(threshold) = file.confidence_threshold {
            cfg.confidence_threshold = threshold;
        }
        if let Some(seconds) = file.cooldown_secs {
            cfg.cooldown = cooldown_from_secs(seconds)?;
        }
        if let Some(interval) = file.detection_interval {
            cfg.detection_interval = interval;
        }
        if let Some(message) = file.startup_message {
            cfg.startup_message = message;
        }
        if let Some(limit) = file.max_consecutive_read_failures {
            cfg.max_consecutive_read_failures = limit;
        }
        if let Some(zones) = file.zones {
            cfg.zones = ZoneBoundaries::new(
                zones.left.unwrap_or(cfg.zones.left()),
                zones.right.unwrap_or(cfg.zones.right()),
            )?;
        }
        if let Some(distance) = file.distance {
            cfg.distance = DistanceThresholds::new(
                distance.high.unwrap_or(cfg.distance.high()),
                distance.low.unwrap_or(cfg.distance.low()),
            )?;
        }
        if let Some(map) = file.allow_list {
            cfg.allow_list = map
                .iter()
                .map(|(raw, display)| (raw.as_str(), display.as_str()))
                .collect();
        }
        if let Some(phrases) = file.phrases {
            cfg.phrases = phrases;
        }
        if let Some(source) = file.source {
            cfg.source.url = source.url.unwrap_or(cfg.source.url);
            cfg.source.target_fps = source.target_fps.unwrap_or(cfg.source.target_fps);
            cfg.source.width = source.width.unwrap_or(cfg.source.width);
            cfg.source.height = source.height.unwrap_or(cfg.source.height);
        }
        if let Some(detector) = file.detector {
            cfg.detector.backend = detector.backend.unwrap_or(cfg.detector.backend);
            cfg.detector.model_path = detector.model_path;
            cfg.detector.script_path = detector.script_path;
        }
        if let Some(speech) = file.speech {
            cfg.speech.engine = speech.engine.unwrap_or(cfg.speech.engine);
            cfg.speech.voice = speech.voice.unwrap_or(cfg.speech.voice);
            cfg.speech.rate_wpm = speech.rate_wpm.unwrap_or(cfg.speech.rate_wpm);
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SCOUT_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(backend) = std::env::var("SCOUT_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("SCOUT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(engine) = std::env::var("SCOUT_SPEECH_ENGINE") {
            if !engine.trim().is_empty() {
                self.speech.engine = engine;
            }
        }
        if let Ok(cooldown) = std::env::var("SCOUT_COOLDOWN_SECS") {
            let seconds: f64 = cooldown
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCOUT_COOLDOWN_SECS must be a number of seconds"))?;
            self.cooldown = cooldown_from_secs(seconds)?;
        }
        if let Ok(threshold) = std::env::var("SCOUT_CONFIDENCE_THRESHOLD") {
            self.confidence_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCOUT_CONFIDENCE_THRESHOLD must be a number"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.confidence_threshold) {
            return Err(anyhow!(
                "confidence_threshold must be in [0, 1), got {}",
                self.confidence_threshold
            ));
        }
        if self.detection_interval == 0 {
            return Err(anyhow!("detection_interval must be at least 1"));
        }
        if self.max_consecutive_read_failures == 0 {
            return Err(anyhow!("max_consecutive_read_failures must be at least 1"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source.target_fps must be at least 1"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if self.allow_list.is_empty() {
            return Err(anyhow!("allow_list must contain at least one label"));
        }
        for (raw, display) in self.allow_list.iter() {
            if display.trim().is_empty() {
                return Err(anyhow!("allow_list entry '{}' has an empty display label", raw));
            }
        }
        self.phrases.validate()?;
        Ok(())
    }
}

fn cooldown_from_secs(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow!("cooldown must be a non-negative number of seconds, got {}", seconds))
}

fn read_config_file(path: &Path) -> Result<AssistantConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
