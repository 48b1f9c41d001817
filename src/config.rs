//! Runtime configuration from `READER_*` environment variables.

use std::{path::PathBuf, str::FromStr, time::Duration};

use log::warn;

use crate::{
    import::{
        epub::DEFAULT_EPUB_SCRIPT, helper::DEFAULT_PYTHON_BIN, pdf::DEFAULT_PDF_SCRIPT, EpubImporter,
        Importers, PdfImporter,
    },
    playback::DEFAULT_STOP_TIMEOUT,
    position::DEFAULT_POSITIONS_FILE,
    speech::{VoiceSettings, DEFAULT_RATE},
};

const DEFAULT_LISTEN_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub positions_file: PathBuf,
    pub runtime_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub voice: Option<String>,
    pub piper_command: Option<String>,
    pub stt_command: Option<String>,
    pub pdf_script: PathBuf,
    pub epub_script: PathBuf,
    pub python_bin: String,
    pub settings: VoiceSettings,
    pub stop_timeout: Duration,
    pub listen_timeout: Duration,
    pub phrase_limit: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ReaderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let path = |key: &str, default: &str| PathBuf::from(text(key).unwrap_or_else(|| default.into()));

        let rate = parse_or(&lookup, "READER_SPEECH_RATE", DEFAULT_RATE);
        let volume = parse_or(&lookup, "READER_SPEECH_VOLUME", 1.0_f32);

        Self {
            positions_file: path("READER_POSITIONS_FILE", DEFAULT_POSITIONS_FILE),
            runtime_dir: path("READER_RUNTIME_DIR", "runtime"),
            voices_dir: path("READER_VOICES_DIR", "assets/voices"),
            voice: text("READER_VOICE"),
            piper_command: text("READER_PIPER_COMMAND"),
            stt_command: text("READER_STT_COMMAND"),
            pdf_script: path("READER_PDF_SCRIPT", DEFAULT_PDF_SCRIPT),
            epub_script: path("READER_EPUB_SCRIPT", DEFAULT_EPUB_SCRIPT),
            python_bin: text("READER_PYTHON_BIN").unwrap_or_else(|| DEFAULT_PYTHON_BIN.into()),
            settings: VoiceSettings::new(rate, volume),
            stop_timeout: Duration::from_millis(parse_or(
                &lookup,
                "READER_STOP_TIMEOUT_MS",
                DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            )),
            listen_timeout: Duration::from_secs(parse_or(
                &lookup,
                "READER_LISTEN_TIMEOUT_SECS",
                DEFAULT_LISTEN_SECS,
            )),
            phrase_limit: Duration::from_secs(parse_or(
                &lookup,
                "READER_PHRASE_LIMIT_SECS",
                DEFAULT_LISTEN_SECS,
            )),
        }
    }

    /// Scratch directory for synthesized audio.
    pub fn output_dir(&self) -> PathBuf {
        self.runtime_dir.join("output")
    }

    pub fn importers(&self) -> Importers {
        Importers {
            pdf: PdfImporter::new(self.python_bin.clone(), self.pdf_script.clone()),
            epub: EpubImporter::new(self.python_bin.clone(), self.epub_script.clone()),
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {key}={raw:?}");
            default
        }),
        None => default,
    }
}
