use std::process::Command;

use super::{SpeechEngine, SpeechError};

const ESPEAK_PROGRAM: &str = "espeak-ng";

/// espeak-ng subprocess engine (Linux).
pub struct EspeakEngine {
    program: String,
    voice: String,
    rate_wpm: u32,
}

impl EspeakEngine {
    pub fn new(voice: &str, rate_wpm: u32) -> Self {
        Self {
            program: ESPEAK_PROGRAM.to_string(),
            voice: voice.to_string(),
            rate_wpm,
        }
    }

    /// Use a different executable with the espeak-ng command line.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-v")
            .arg(&self.voice)
            .arg("-s")
            .arg(self.rate_wpm.to_string())
            .arg("--")
            .arg(text);
        cmd
    }
}

impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let output = self.command(text).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn warm_up(&mut self) -> Result<(), SpeechError> {
        let available = Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !available {
            return Err(SpeechError::Unavailable(format!(
                "{} not found on PATH",
                self.program
            )));
        }
        Ok(())
    }
}

/// Writes utterances to the log instead of an audio device.
#[derive(Default)]
pub struct ConsoleEngine;

impl ConsoleEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SpeechEngine for ConsoleEngine {
    fn name(&self) -> &'static str {
        "console"
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        log::info!("speak: {}", text);
        Ok(())
    }
}
