//! Voice control: a background loop that listens for spoken commands and
//! drives the [`PlaybackController`] the same way the UI buttons do.

pub mod commands;
pub mod recognizer;

use std::{
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info};

use crate::playback::{PlaybackController, ReaderEvent};

/// Pause after a recognition service error before listening again.
pub const SERVICE_RETRY_DELAY: Duration = Duration::from_secs(1);

pub use commands::{parse_command, VoiceCommand};
pub use recognizer::{CommandRecognizer, RecognitionError, Recognizer};

/// What the listener does with a recognition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    Continue,
    /// Log, wait the retry delay, then listen again.
    LogAndContinue,
}

pub fn policy_for(err: &RecognitionError) -> ErrorPolicy {
    match err {
        RecognitionError::Timeout | RecognitionError::Unintelligible => ErrorPolicy::Continue,
        RecognitionError::Service(_) => ErrorPolicy::LogAndContinue,
    }
}

/// Result of a single listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    Executed(VoiceCommand),
    /// The command was recognized but the controller refused it.
    Rejected(VoiceCommand, String),
    Ignored(String),
    Failed(ErrorPolicy),
}

pub struct CommandListener {
    recognizer: Box<dyn Recognizer>,
    controller: PlaybackController,
    notices: Sender<ReaderEvent>,
    listen_timeout: Duration,
    phrase_limit: Duration,
    retry_delay: Duration,
}

impl CommandListener {
    pub fn new(
        recognizer: Box<dyn Recognizer>,
        controller: PlaybackController,
        notices: Sender<ReaderEvent>,
        listen_timeout: Duration,
        phrase_limit: Duration,
    ) -> Self {
        Self {
            recognizer,
            controller,
            notices,
            listen_timeout,
            phrase_limit,
            retry_delay: SERVICE_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn run_once(&mut self) -> ListenOutcome {
        debug!("Listening for commands...");
        let phrase = match self.recognizer.listen(self.listen_timeout, self.phrase_limit) {
            Ok(phrase) => phrase.to_lowercase(),
            Err(err) => {
                let policy = policy_for(&err);
                if policy == ErrorPolicy::LogAndContinue {
                    error!("Speech recognition error: {err}");
                    thread::sleep(self.retry_delay);
                }
                return ListenOutcome::Failed(policy);
            }
        };
        info!("Recognized command: {phrase}");

        let Some(command) = parse_command(&phrase) else {
            return ListenOutcome::Ignored(phrase);
        };
        match command.apply(&self.controller) {
            Ok(()) => ListenOutcome::Executed(command),
            Err(err) => {
                info!("Voice command {command:?} refused: {err}");
                let _ = self.notices.send(ReaderEvent::Notice(err.to_string()));
                ListenOutcome::Rejected(command, err.to_string())
            }
        }
    }

    /// Listens forever; only process exit ends the loop.
    pub fn run(mut self) {
        loop {
            self.run_once();
        }
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("voice-commands".into())
            .spawn(move || self.run())
    }
}
