//! Text-to-speech service used by the playback worker.
//!
//! The controller only sees [`SpeechService`]: a blocking `speak` plus rate and
//! volume properties and a best-effort `stop`. [`PiperSpeech`] implements it
//! with the piper CLI and `rodio`; tests substitute their own fakes.

pub mod piper;
pub mod voices;

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::AudioError;

pub use piper::PiperSpeech;
pub use voices::{VoiceInfo, VoiceLibrary};

/// Words per minute used when nothing else is configured.
pub const DEFAULT_RATE: u32 = 150;
/// Amount a single "increase/decrease speed" command moves the rate.
pub const RATE_STEP: u32 = 20;
/// Lowest rate reachable by decreasing the speed.
pub const MIN_RATE: u32 = 50;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("voice model not found at {0}")]
    VoiceNotFound(PathBuf),
    #[error("failed to spawn piper process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("piper exited with status {status}: {stderr}")]
    Piper { status: i32, stderr: String },
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("{0}")]
    Other(String),
}

pub trait SpeechService: Send + Sync {
    fn set_rate(&self, rate: u32);
    fn set_volume(&self, volume: f32);
    /// Speaks `text`, returning once it has been spoken or interrupted.
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
    /// Aborts an in-flight `speak` if there is one.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub rate: u32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            volume: 1.0,
        }
    }
}

impl VoiceSettings {
    pub fn new(rate: u32, volume: f32) -> Self {
        Self {
            rate,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// Moves the rate by `delta`. Increases are unbounded, decreases stop at [`MIN_RATE`].
    pub fn adjust_rate(&mut self, delta: i32) {
        let adjusted = i64::from(self.rate) + i64::from(delta);
        self.rate = if delta < 0 {
            adjusted.max(i64::from(MIN_RATE)) as u32
        } else {
            adjusted.min(i64::from(u32::MAX)) as u32
        };
    }

    pub fn apply_to(&self, speech: &dyn SpeechService) {
        speech.set_rate(self.rate);
        speech.set_volume(self.volume);
    }
}
