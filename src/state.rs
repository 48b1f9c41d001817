use std::{
    fs,
    path::Path,
    sync::{
        mpsc::{self, Receiver, Sender},
        Arc,
    },
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    config::ReaderConfig,
    import::{self, Importers},
    playback::{ControllerOptions, PlaybackController, ReaderEvent},
    position::JsonPositionStore,
    speech::{piper::PiperCommand, PiperSpeech, VoiceInfo, VoiceLibrary},
    voice::{CommandListener, CommandRecognizer},
};

/// Everything the shell needs, wired from a [`ReaderConfig`].
pub struct AppState {
    pub controller: PlaybackController,
    voices: VoiceLibrary,
    notices: Sender<ReaderEvent>,
    importers: Importers,
}

impl AppState {
    /// Builds the controller and, when configured, starts the voice listener.
    /// Returns the receiving end of the event channel for the UI to render.
    pub fn initialise(config: &ReaderConfig) -> Result<(Self, Receiver<ReaderEvent>)> {
        let output_dir = config.output_dir();
        fs::create_dir_all(&output_dir).with_context(|| {
            format!("unable to create output directory {}", output_dir.display())
        })?;

        let voices = VoiceLibrary::scan(config.voices_dir.clone());
        let voice = voices
            .select(config.voice.as_deref())
            .context("no piper voice available")?;
        info!("Speaking with voice {}", voice.label);
        let command = PiperCommand::resolve(config.piper_command.as_deref(), &config.runtime_dir)
            .context("invalid piper command")?;
        let speech = PiperSpeech::new(command, voice.model_path.clone(), &output_dir);

        let store = JsonPositionStore::new(config.positions_file.clone());
        let (events_tx, events) = mpsc::channel();
        let controller = PlaybackController::new(
            Arc::new(speech),
            Arc::new(store),
            events_tx.clone(),
            ControllerOptions {
                settings: config.settings,
                stop_timeout: config.stop_timeout,
            },
        );

        match config.stt_command.as_deref() {
            Some(command_line) => {
                let recognizer = CommandRecognizer::from_command_line(command_line)
                    .context("invalid speech recognition command")?;
                CommandListener::new(
                    Box::new(recognizer),
                    controller.clone(),
                    events_tx.clone(),
                    config.listen_timeout,
                    config.phrase_limit,
                )
                .spawn()
                .context("failed to start voice command listener")?;
                info!("Voice commands enabled");
            }
            None => info!("READER_STT_COMMAND not set, voice commands disabled"),
        }

        let state = Self {
            controller,
            voices,
            notices: events_tx,
            importers: config.importers(),
        };
        Ok((state, events))
    }

    /// Opens a book and returns whether it is now the open document. Failures
    /// become a single notice and leave the controller as it was.
    pub fn open(&self, path: &Path) -> bool {
        let result = import::load_document(path, &self.importers)
            .map_err(|err| err.to_string())
            .and_then(|document| self.controller.load(document).map_err(|err| err.to_string()));
        match result {
            Ok(_) => true,
            Err(message) => {
                warn!("Error loading book {}: {message}", path.display());
                self.notify(format!("Error loading book: {message}"));
                false
            }
        }
    }

    pub fn notify(&self, message: impl Into<String>) {
        let _ = self.notices.send(ReaderEvent::Notice(message.into()));
    }

    pub fn voice_list(&self) -> &[VoiceInfo] {
        self.voices.list()
    }
}
