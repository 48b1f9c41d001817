use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use log::{debug, error, warn};
use parking_lot::Mutex;
use shlex::Shlex;

use super::{SpeechError, SpeechService, VoiceSettings, DEFAULT_RATE};
use crate::audio::AudioPlayer;

/// How the piper synthesizer is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PiperCommand {
    /// A shell-style command line, split with shlex.
    Custom(Vec<String>),
    Executable(PathBuf),
    PythonModule,
}

impl PiperCommand {
    /// Uses `command_line` when given, otherwise `runtime/piper/piper[.exe]`
    /// if present, otherwise `python -m piper`.
    pub fn resolve(command_line: Option<&str>, runtime_dir: &Path) -> Result<Self, SpeechError> {
        if let Some(raw) = command_line {
            let parts: Vec<String> = Shlex::new(raw).collect();
            if parts.is_empty() {
                return Err(SpeechError::Other("READER_PIPER_COMMAND is empty".to_string()));
            }
            return Ok(Self::Custom(parts));
        }
        let candidate = runtime_dir
            .join("piper")
            .join(if cfg!(windows) { "piper.exe" } else { "piper" });
        if candidate.exists() {
            return Ok(Self::Executable(candidate));
        }
        Ok(Self::PythonModule)
    }

    fn to_command(&self) -> Command {
        match self {
            Self::Custom(parts) => {
                let mut command = Command::new(&parts[0]);
                command.args(&parts[1..]);
                command
            }
            Self::Executable(path) => Command::new(path),
            Self::PythonModule => {
                let mut command = Command::new("python");
                command.args(["-m", "piper"]);
                command
            }
        }
    }
}

/// Speaks by synthesizing each chunk to a scratch WAV with piper and playing it back.
pub struct PiperSpeech {
    command: PiperCommand,
    model_path: PathBuf,
    scratch_path: PathBuf,
    settings: Mutex<VoiceSettings>,
    player: AudioPlayer,
    interrupted: AtomicBool,
}

impl PiperSpeech {
    pub fn new(command: PiperCommand, model_path: PathBuf, scratch_dir: &Path) -> Self {
        Self {
            command,
            model_path,
            scratch_path: scratch_dir.join("utterance.wav"),
            settings: Mutex::new(VoiceSettings::default()),
            player: AudioPlayer::new(),
            interrupted: AtomicBool::new(false),
        }
    }

    /// Piper's `--length_scale` is inversely proportional to speaking speed.
    fn length_scale(rate: u32) -> f32 {
        DEFAULT_RATE as f32 / rate.max(1) as f32
    }

    /// Runs piper on `text` and returns the path of the WAV it wrote.
    pub fn synthesize(&self, text: &str) -> Result<PathBuf, SpeechError> {
        if !self.model_path.exists() {
            return Err(SpeechError::VoiceNotFound(self.model_path.clone()));
        }
        if let Some(parent) = self
            .scratch_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|err| {
                SpeechError::Other(format!(
                    "Unable to create scratch directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let rate = self.settings.lock().rate;
        let start = Instant::now();
        let mut command = self.command.to_command();
        command
            .arg("--model")
            .arg(&self.model_path)
            .arg("--output_file")
            .arg(&self.scratch_path)
            .arg("--length_scale")
            .arg(Self::length_scale(rate).to_string());
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SpeechError::Spawn)?;
        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| SpeechError::Other("Failed to access piper stdin".into()))?;
            // A piper that exits early closes its stdin; its exit status tells the rest.
            if let Err(err) = stdin.write_all(text.as_bytes()) {
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(SpeechError::Other(err.to_string()));
                }
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|err| SpeechError::Other(err.to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let status = output.status.code().unwrap_or_default();
            error!("Piper exited with status {status}: {stderr}");
            return Err(SpeechError::Piper { status, stderr });
        }
        if !self.scratch_path.exists() {
            warn!(
                "Piper succeeded but the expected output {:?} was not created",
                self.scratch_path
            );
        }
        debug!("Synthesized {:?} in {} ms", text, start.elapsed().as_millis());
        Ok(self.scratch_path.clone())
    }
}

impl SpeechService for PiperSpeech {
    fn set_rate(&self, rate: u32) {
        self.settings.lock().rate = rate;
    }

    fn set_volume(&self, volume: f32) {
        self.settings.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.interrupted.store(false, Ordering::Release);
        let wav = self.synthesize(text)?;
        if self.interrupted.load(Ordering::Acquire) {
            return Ok(());
        }
        let volume = self.settings.lock().volume;
        self.player.play_blocking(&wav, volume)?;
        Ok(())
    }

    fn stop(&self) {
        self.interrupted.store(true, Ordering::Release);
        if self.player.is_playing() {
            debug!("Interrupting playback");
        }
        self.player.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    const MOCK_PIPER: &str = r#"while [ $# -gt 0 ]; do
  case "$1" in
    --output_file) out="$2"; shift ;;
    --length_scale) scale="$2"; shift ;;
  esac
  shift
done
printf 'WAV:%s:' "$scale" > "$out"
cat >> "$out"
"#;

    fn mock_speech(temp: &TempDir, script: &str, model_exists: bool) -> PiperSpeech {
        let script_path = temp.path().join("mock_piper.sh");
        fs::write(&script_path, script).unwrap();
        let model_path = temp.path().join("voice.onnx");
        if model_exists {
            fs::write(&model_path, b"voice").unwrap();
        }
        let command =
            PiperCommand::resolve(Some(&format!("sh {}", script_path.display())), temp.path())
                .unwrap();
        PiperSpeech::new(command, model_path, &temp.path().join("scratch"))
    }

    #[test]
    fn resolves_custom_command_with_shlex() {
        let command = PiperCommand::resolve(Some("piper --quiet 'a b'"), Path::new("runtime")).unwrap();
        assert_eq!(
            command,
            PiperCommand::Custom(vec!["piper".into(), "--quiet".into(), "a b".into()])
        );
        assert!(PiperCommand::resolve(Some("   "), Path::new("runtime")).is_err());
    }

    #[test]
    fn falls_back_to_python_module_without_runtime_binary() {
        let temp = TempDir::new().unwrap();
        let command = PiperCommand::resolve(None, temp.path()).unwrap();
        assert_eq!(command, PiperCommand::PythonModule);
    }

    #[test]
    fn length_scale_follows_rate() {
        assert!((PiperSpeech::length_scale(150) - 1.0).abs() < f32::EPSILON);
        assert!((PiperSpeech::length_scale(300) - 0.5).abs() < f32::EPSILON);
        assert!(PiperSpeech::length_scale(0).is_finite());
    }

    #[cfg(unix)]
    #[test]
    fn synthesize_writes_text_through_piper() {
        let temp = TempDir::new().unwrap();
        let speech = mock_speech(&temp, MOCK_PIPER, true);
        speech.set_rate(300);
        let wav = speech.synthesize("hello").unwrap();
        let output = fs::read_to_string(wav).unwrap();
        assert_eq!(output, "WAV:0.5:hello");
    }

    #[cfg(unix)]
    #[test]
    fn missing_voice_is_reported() {
        let temp = TempDir::new().unwrap();
        let speech = mock_speech(&temp, MOCK_PIPER, false);
        assert!(matches!(
            speech.synthesize("hello"),
            Err(SpeechError::VoiceNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn piper_failure_carries_stderr() {
        let temp = TempDir::new().unwrap();
        let speech = mock_speech(&temp, "printf boom >&2\nexit 2\n", true);
        match speech.speak("hello") {
            Err(SpeechError::Piper { status, stderr }) => {
                assert_eq!(status, 2);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn undecodable_output_surfaces_audio_error() {
        let temp = TempDir::new().unwrap();
        let speech = mock_speech(&temp, MOCK_PIPER, true);
        assert!(matches!(speech.speak("hello"), Err(SpeechError::Audio(_))));
    }
}
