use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("could not open audio file: {0}")]
    Io(String),
    #[error("audio file is corrupt: {0}")]
    Decode(String),
    #[error("no playback device found")]
    Device,
}

/// Plays one clip at a time. The current sink is shared so that `stop` can
/// interrupt a `play_blocking` call running on another thread.
#[derive(Default)]
pub struct AudioPlayer {
    current: Mutex<Option<Arc<Sink>>>,
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plays `path` at `volume` and returns once playback finishes or is stopped.
    pub fn play_blocking(&self, path: &Path, volume: f32) -> Result<(), AudioError> {
        let file = File::open(path).map_err(|err| AudioError::Io(err.to_string()))?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|err| AudioError::Decode(err.to_string()))?;

        // The stream must outlive the sink; it is not Send, so it stays on this thread.
        let (_stream, handle) = OutputStream::try_default().map_err(|_| AudioError::Device)?;
        let sink = Sink::try_new(&handle).map_err(|err| AudioError::Io(err.to_string()))?;
        sink.set_volume(volume.clamp(0.0, 1.0));
        sink.append(decoder);
        let sink = Arc::new(sink);
        *self.current.lock() = Some(Arc::clone(&sink));

        sink.sleep_until_end();

        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, &sink)) {
            *current = None;
        }
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(sink) = self.current.lock().take() {
            sink.stop();
        }
    }

    /// Whether a clip is queued on the current sink.
    pub fn is_playing(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|sink| !sink.empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn returns_error_for_missing_file() {
        let player = AudioPlayer::new();
        let result = player.play_blocking(Path::new("/does/not/exist.wav"), 1.0);
        assert!(matches!(result, Err(AudioError::Io(_))));
    }

    #[test]
    fn fails_for_invalid_wav() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "not a wav").unwrap();
        let player = AudioPlayer::new();
        let result = player.play_blocking(tmp.path(), 1.0);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn stop_without_playback_is_harmless() {
        let player = AudioPlayer::new();
        assert!(!player.is_playing());
        player.stop();
        assert!(!player.is_playing());
        assert!(player.current.lock().is_none());
    }

    #[test]
    fn failed_playback_leaves_player_idle() {
        let player = AudioPlayer::new();
        assert!(player.play_blocking(Path::new("/does/not/exist.wav"), 1.0).is_err());
        assert!(!player.is_playing());
    }
}
