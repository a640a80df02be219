use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use voice_scout::config::AssistantConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SCOUT_CONFIG",
        "SCOUT_SOURCE_URL",
        "SCOUT_DETECTOR",
        "SCOUT_MODEL_PATH",
        "SCOUT_SPEECH_ENGINE",
        "SCOUT_COOLDOWN_SECS",
        "SCOUT_CONFIDENCE_THRESHOLD",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_from_env_path_with_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "confidence_threshold": 0.6,
        "cooldown_secs": 5,
        "detection_interval": 1,
        "zones": { "left": 0.25, "right": 0.75 },
        "distance": { "high": 0.2, "low": 0.05 },
        "allow_list": { "person": "pessoa", "dog": "cachorro" },
        "source": { "url": "stub://porch", "target_fps": 5, "width": 320, "height": 240 },
        "speech": { "engine": "espeak", "voice": "pt", "rate_wpm": 150 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SCOUT_CONFIG", file.path());
    std::env::set_var("SCOUT_SPEECH_ENGINE", "console");
    std::env::set_var("SCOUT_COOLDOWN_SECS", "2.5");

    let cfg = AssistantConfig::load().expect("load config");

    assert_eq!(cfg.confidence_threshold, 0.6);
    assert_eq!(cfg.cooldown, Duration::from_millis(2500));
    assert_eq!(cfg.detection_interval, 1);
    assert_eq!(cfg.zones.left(), 0.25);
    assert_eq!(cfg.distance.low(), 0.05);
    assert_eq!(cfg.allow_list.display_label("dog"), Some("cachorro"));
    assert_eq!(cfg.allow_list.display_label("car"), None);
    assert_eq!(cfg.source.url, "stub://porch");
    assert_eq!(cfg.source.width, 320);
    assert_eq!(cfg.speech.engine, "console");
    assert_eq!(cfg.speech.voice, "pt");
    assert_eq!(cfg.speech.rate_wpm, 150);
    assert_eq!(cfg.detector.backend, "scene");

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        startup_message = ""

        [detector]
        backend = "script"
        script_path = "fixtures/walk.json"

        [phrases]
        center = "em frente"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = AssistantConfig::load_from(file.path()).expect("load config");

    assert_eq!(cfg.startup_message, "");
    assert_eq!(cfg.detector.backend, "script");
    assert_eq!(
        cfg.detector.script_path.as_deref(),
        Some(std::path::Path::new("fixtures/walk.json"))
    );
    assert_eq!(cfg.phrases.center, "em frente");
    assert_eq!(cfg.phrases.left, "esquerda");
    assert_eq!(cfg.cooldown, Duration::from_secs(3));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"detection_interval": 0}"#).expect("write config");
    assert!(AssistantConfig::load_from(file.path()).is_err());

    std::env::set_var("SCOUT_CONFIDENCE_THRESHOLD", "high");
    assert!(AssistantConfig::load().is_err());
    std::env::set_var("SCOUT_CONFIDENCE_THRESHOLD", "1.5");
    assert!(AssistantConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SCOUT_CONFIG", "/nonexistent/voice-scout.json");
    let err = AssistantConfig::load().expect_err("missing file");
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
