//! Speech output.
//!
//! - `SpeechEngine`: blocking text-to-speech boundary.
//! - `SpeechDispatcher`: single worker thread that owns the engine and
//!   receives accepted messages through a one-slot channel.
//! - Engines: `espeak` (espeak-ng subprocess) and `console` (log only).

mod dispatcher;
mod engines;

pub use dispatcher::{DispatchOutcome, SpeechDispatcher};
pub use engines::{ConsoleEngine, EspeakEngine};

use anyhow::{anyhow, Result};
use thiserror::Error;

use crate::config::SpeechSettings;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),
    #[error("speech engine failed: {0}")]
    Engine(String),
    #[error("speech engine i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text-to-speech engine.
///
/// `speak` blocks until the utterance has finished playing (or failed).
/// Engines carry no cooldown or concurrency guard of their own; the
/// dispatcher guarantees at most one call is ever in progress.
pub trait SpeechEngine: Send {
    fn name(&self) -> &'static str;

    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;

    /// Probe the engine once at start-up. Failure here is fatal.
    fn warm_up(&mut self) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// Build the configured engine and probe it.
pub fn build_engine(settings: &SpeechSettings) -> Result<Box<dyn SpeechEngine>> {
    let mut engine: Box<dyn SpeechEngine> = match settings.engine.as_str() {
        "espeak" => Box::new(EspeakEngine::new(&settings.voice, settings.rate_wpm)),
        "console" => Box::new(ConsoleEngine::new()),
        other => return Err(anyhow!("unknown speech engine '{}'", other)),
    };
    engine
        .warm_up()
        .map_err(|e| anyhow!("failed to initialise {} speech engine: {}", engine.name(), e))?;
    log::info!("speech engine ready: {}", engine.name());
    Ok(engine)
}
