//! scoutd - spoken obstacle announcements from a camera feed
//!
//! This daemon:
//! 1. Loads configuration (file, environment, command line)
//! 2. Builds the detector backend and speech engine
//! 3. Reads frames from the configured source
//! 4. Speaks at most one short message per cooldown window
//! 5. Drains the in-flight utterance on Ctrl-C

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use voice_scout::{
    build_engine, open_source, AssistantConfig, Assistant, BackendRegistry, RunOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file (.toml or .json).
    #[arg(long, env = "SCOUT_CONFIG")]
    config: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Do not log messages dropped by the throttle.
    #[arg(long)]
    no_throttle_log: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match args.config.as_deref() {
        Some(path) => AssistantConfig::load_from(path)?,
        None => AssistantConfig::load()?,
    };
    log::info!(
        "scoutd {} starting: source={} detector={} speech={} cooldown={:?}",
        env!("CARGO_PKG_VERSION"),
        cfg.source.url,
        cfg.detector.backend,
        cfg.speech.engine,
        cfg.cooldown
    );

    let registry = BackendRegistry::with_builtin();
    let detector = registry.build(&cfg)?;
    let engine = build_engine(&cfg.speech)?;
    let mut source = open_source(&cfg.source)?;
    source.connect()?;

    let mut assistant = Assistant::new(&cfg, detector, engine)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    assistant.announce_startup(Instant::now());

    let mut options = RunOptions::from_config(&cfg);
    options.max_frames = args.max_frames;
    options.log_throttled = !args.no_throttle_log;

    let result = assistant.run(source.as_mut(), &options, &shutdown);
    log::info!("shutting down, waiting for speech to finish...");
    assistant.shutdown();

    let summary = result?;
    log::info!(
        "scoutd stopped ({:?}): frames={} cycles={} announcements={} throttled={} refused={} read_failures={} detect_failures={}",
        summary.stop_reason,
        summary.frames_read,
        summary.cycles_run,
        summary.announcements,
        summary.throttled,
        summary.refused,
        summary.read_failures,
        summary.detect_failures
    );
    Ok(())
}
