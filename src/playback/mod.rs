//! The reading-position state machine.
//!
//! [`PlaybackController`] is `Idle` or `Reading`. `start`, `stop`, `restart`,
//! `load` and `shutdown` are serialized by an operation lock, so the UI shell
//! and the voice listener can call them from different threads. While
//! `Reading`, a dedicated worker speaks the document one word at a time,
//! persisting the cursor after every word and checking its
//! [`CancellationToken`] before each one.
//!
//! `stop` waits for the worker only for a bounded time. If the worker is stuck
//! inside the speech service past that window, the controller reports `Idle`
//! anyway while the old worker may still be running; a generation number
//! keeps such a stale worker from touching the session once a new run starts.

pub mod cancellation;
pub mod events;

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    document::{words, Document},
    position::{Position, PositionStore},
    speech::{SpeechError, SpeechService, VoiceSettings},
};

pub use cancellation::CancellationToken;
pub use events::ReaderEvent;

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    #[error("Please open a book first.")]
    NoDocumentLoaded,
    #[error("Already reading.")]
    AlreadyReading,
    #[error("Not currently reading.")]
    NotReading,
    #[error("failed to start playback worker: {0}")]
    WorkerSpawn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Reading,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub settings: VoiceSettings,
    /// How long `stop` waits for the worker before forcing `Idle`.
    pub stop_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            settings: VoiceSettings::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

struct Worker {
    token: CancellationToken,
    exited: Receiver<()>,
    handle: JoinHandle<()>,
}

struct Session {
    state: PlaybackState,
    document: Option<Arc<Document>>,
    position: Position,
    settings: VoiceSettings,
    generation: u64,
    worker: Option<Worker>,
}

struct Shared {
    speech: Arc<dyn SpeechService>,
    store: Arc<dyn PositionStore>,
    events: Sender<ReaderEvent>,
    stop_timeout: Duration,
    ops: Mutex<()>,
    session: Mutex<Session>,
}

impl Shared {
    fn emit(&self, event: ReaderEvent) {
        let _ = self.events.send(event);
    }

    fn persist(&self, document_id: &str, position: Position) {
        if let Err(err) = self.store.save(document_id, position) {
            warn!("Failed to persist position for {document_id}: {err}");
        }
    }
}

#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    pub fn new(
        speech: Arc<dyn SpeechService>,
        store: Arc<dyn PositionStore>,
        events: Sender<ReaderEvent>,
        options: ControllerOptions,
    ) -> Self {
        options.settings.apply_to(speech.as_ref());
        Self {
            shared: Arc::new(Shared {
                speech,
                store,
                events,
                stop_timeout: options.stop_timeout,
                ops: Mutex::new(()),
                session: Mutex::new(Session {
                    state: PlaybackState::Idle,
                    document: None,
                    position: Position::START,
                    settings: options.settings,
                    generation: 0,
                    worker: None,
                }),
            }),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.session.lock().state
    }

    pub fn position(&self) -> Position {
        self.shared.session.lock().position
    }

    pub fn settings(&self) -> VoiceSettings {
        self.shared.session.lock().settings
    }

    pub fn document(&self) -> Option<Arc<Document>> {
        self.shared.session.lock().document.clone()
    }

    pub fn document_id(&self) -> Option<String> {
        self.document().map(|document| document.id().to_string())
    }

    /// Opens `document` and restores its saved position.
    ///
    /// A saved sentence index beyond the document falls back to the start.
    pub fn load(&self, document: Document) -> Result<Position, ReaderError> {
        let _op = self.shared.ops.lock();
        let mut session = self.shared.session.lock();
        if session.state == PlaybackState::Reading {
            return Err(ReaderError::AlreadyReading);
        }

        let saved = self.shared.store.load(document.id());
        let position = if saved.sentence > document.len() {
            Position::START
        } else if saved.sentence == document.len() {
            Position::new(saved.sentence, 0)
        } else {
            saved
        };
        info!(
            "Opened {} at sentence {} word {}",
            document.id(),
            position.sentence,
            position.word
        );

        self.shared.emit(ReaderEvent::DocumentLoaded {
            document_id: document.id().to_string(),
            pages: document.pages().to_vec(),
            sentence_count: document.len(),
            progress: position.sentence,
        });
        self.shared.emit(ReaderEvent::ClearHighlight);
        session.position = position;
        session.document = Some(Arc::new(document));
        Ok(position)
    }

    /// Begins (or resumes) reading from the current position.
    pub fn start(&self) -> Result<(), ReaderError> {
        let _op = self.shared.ops.lock();
        self.start_locked()
    }

    /// Stops reading, waiting up to the configured timeout for the worker.
    pub fn stop(&self) -> Result<(), ReaderError> {
        let _op = self.shared.ops.lock();
        self.stop_locked()
    }

    /// Rewinds to the first word of the document and starts reading.
    pub fn restart(&self) -> Result<(), ReaderError> {
        let _op = self.shared.ops.lock();
        let mut session = self.shared.session.lock();
        let document = loaded_document(&session)?;
        if session.state == PlaybackState::Reading {
            return Err(ReaderError::AlreadyReading);
        }
        // Reset and spawn under one lock so a stale worker cannot record in between.
        session.position = Position::START;
        self.shared.persist(document.id(), Position::START);
        self.shared.emit(ReaderEvent::Progress(0));
        self.spawn_worker(&mut session, document)
    }

    pub fn set_rate(&self, rate: u32) -> u32 {
        self.update_settings(|settings| settings.rate = rate).rate
    }

    /// Moves the rate by `delta`; decreases stop at [`crate::speech::MIN_RATE`].
    pub fn adjust_rate(&self, delta: i32) -> u32 {
        self.update_settings(|settings| settings.adjust_rate(delta))
            .rate
    }

    pub fn set_volume(&self, volume: f32) -> f32 {
        self.update_settings(|settings| *settings = VoiceSettings::new(settings.rate, volume))
            .volume
    }

    /// Stops reading if needed and saves the current position of the open document.
    pub fn shutdown(&self) {
        let _op = self.shared.ops.lock();
        if let Err(err) = self.stop_locked() {
            debug!("Nothing to stop on shutdown: {err}");
        }
        let session = self.shared.session.lock();
        if let Some(document) = &session.document {
            self.shared.persist(document.id(), session.position);
        }
    }

    fn update_settings(&self, change: impl FnOnce(&mut VoiceSettings)) -> VoiceSettings {
        let settings = {
            let mut session = self.shared.session.lock();
            let before = session.settings;
            change(&mut session.settings);
            let after = session.settings;
            after.apply_to(self.shared.speech.as_ref());
            if before.rate != after.rate {
                self.shared.emit(ReaderEvent::RateChanged(after.rate));
            }
            if before.volume != after.volume {
                self.shared.emit(ReaderEvent::VolumeChanged(after.volume));
            }
            after
        };
        debug!("Voice settings now rate={} volume={}", settings.rate, settings.volume);
        settings
    }

    fn start_locked(&self) -> Result<(), ReaderError> {
        let mut session = self.shared.session.lock();
        let document = loaded_document(&session)?;
        if session.state == PlaybackState::Reading {
            return Err(ReaderError::AlreadyReading);
        }
        self.spawn_worker(&mut session, document)
    }

    fn spawn_worker(
        &self,
        session: &mut Session,
        document: Arc<Document>,
    ) -> Result<(), ReaderError> {
        session.generation += 1;
        let token = CancellationToken::new();
        let (exited_tx, exited_rx) = mpsc::channel();
        let run = PlaybackRun {
            shared: Arc::clone(&self.shared),
            start: session.position,
            settings: session.settings,
            generation: session.generation,
            token: token.clone(),
            document,
            _exited: exited_tx,
        };
        let handle = thread::Builder::new()
            .name("playback".into())
            .spawn(move || run.run())
            .map_err(|err| {
                error!("Could not spawn playback worker: {err}");
                ReaderError::WorkerSpawn(err.to_string())
            })?;

        info!(
            "Reading from sentence {} word {}",
            session.position.sentence, session.position.word
        );
        session.state = PlaybackState::Reading;
        session.worker = Some(Worker {
            token,
            exited: exited_rx,
            handle,
        });
        Ok(())
    }

    fn stop_locked(&self) -> Result<(), ReaderError> {
        let worker = {
            let mut session = self.shared.session.lock();
            if session.state != PlaybackState::Reading {
                return Err(ReaderError::NotReading);
            }
            session.worker.take()
        };

        if let Some(worker) = worker {
            worker.token.cancel();
            self.shared.speech.stop();
            match worker.exited.recv_timeout(self.shared.stop_timeout) {
                Err(RecvTimeoutError::Timeout) => warn!(
                    "Playback worker still running after {:?}, forcing Idle",
                    self.shared.stop_timeout
                ),
                _ => {
                    if worker.handle.join().is_err() {
                        error!("Playback worker panicked");
                    }
                }
            }
        }

        let mut session = self.shared.session.lock();
        session.state = PlaybackState::Idle;
        info!(
            "Stopped at sentence {} word {}",
            session.position.sentence, session.position.word
        );
        Ok(())
    }
}

fn loaded_document(session: &Session) -> Result<Arc<Document>, ReaderError> {
    match &session.document {
        Some(document) if !document.is_empty() => Ok(Arc::clone(document)),
        _ => Err(ReaderError::NoDocumentLoaded),
    }
}

/// One pass of the playback loop, owned by the worker thread.
struct PlaybackRun {
    shared: Arc<Shared>,
    document: Arc<Document>,
    start: Position,
    settings: VoiceSettings,
    generation: u64,
    token: CancellationToken,
    // Dropped when the worker returns, which wakes a waiting `stop`.
    _exited: Sender<()>,
}

impl PlaybackRun {
    fn run(self) {
        self.settings.apply_to(self.shared.speech.as_ref());

        let mut word_offset = self.start.word;
        for (sentence_index, sentence) in self
            .document
            .sentences()
            .iter()
            .enumerate()
            .skip(self.start.sentence)
        {
            self.shared.emit(ReaderEvent::Highlight(sentence.clone()));
            let words = words(sentence);

            for (word_index, word) in words.iter().enumerate().skip(word_offset) {
                if self.token.is_cancelled() {
                    self.record(Position::new(sentence_index, word_index));
                    debug!("Playback cancelled at sentence {sentence_index} word {word_index}");
                    return;
                }

                if let Err(err) = self.shared.speech.speak(word) {
                    self.fail(Position::new(sentence_index, word_index), err);
                    return;
                }

                if !self.record(Position::new(sentence_index, word_index + 1)) {
                    return;
                }
                self.shared.emit(ReaderEvent::Progress(sentence_index + 1));
            }
            word_offset = 0;
        }

        // Cancelled during the last word: the cursor was already recorded.
        if self.token.is_cancelled() {
            debug!("Playback cancelled after the last word");
            return;
        }
        self.finish();
    }

    /// Saves `position` unless a newer run has taken over; returns whether it did.
    fn record(&self, position: Position) -> bool {
        let mut session = self.shared.session.lock();
        if session.generation != self.generation {
            debug!("Stale playback worker ignored at {position:?}");
            return false;
        }
        session.position = position;
        self.shared.persist(self.document.id(), position);
        true
    }

    fn fail(&self, position: Position, err: SpeechError) {
        error!(
            "Speech failed at sentence {} word {}: {err}",
            position.sentence, position.word
        );
        if !self.record(position) {
            return;
        }
        self.shared.session.lock().state = PlaybackState::Idle;
        self.shared.emit(ReaderEvent::SpeechFailed(err.to_string()));
    }

    fn finish(&self) {
        {
            let mut session = self.shared.session.lock();
            if session.generation != self.generation {
                return;
            }
            session.position = Position::START;
            session.state = PlaybackState::Idle;
            self.shared.persist(self.document.id(), Position::START);
        }
        info!("Finished reading {}", self.document.id());
        self.shared.emit(ReaderEvent::ClearHighlight);
        self.shared.emit(ReaderEvent::Progress(0));
        self.shared.emit(ReaderEvent::Finished);
    }
}
