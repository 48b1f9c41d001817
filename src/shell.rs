//! Console front end standing in for the reader window.
//!
//! Each input line maps to one of the window's buttons. Controller events are
//! rendered by a separate thread so progress keeps printing while the prompt
//! waits for input.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
    thread,
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    playback::{PlaybackState, ReaderEvent},
    state::AppState,
};

const PROGRESS_WIDTH: usize = 30;

const HELP: &str = "commands: open <path> | start | stop | restart | speed <wpm> | \
volume <0-1> | next | prev | status | voices | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Open(PathBuf),
    Start,
    Stop,
    Restart,
    Speed(u32),
    Volume(f32),
    NextPage,
    PrevPage,
    Status,
    Voices,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));
    let command = match word.to_lowercase().as_str() {
        "open" if !rest.is_empty() => ShellCommand::Open(PathBuf::from(rest)),
        "open" => return Err("usage: open <path>".into()),
        "start" | "resume" => ShellCommand::Start,
        "stop" | "pause" => ShellCommand::Stop,
        "restart" => ShellCommand::Restart,
        "speed" => ShellCommand::Speed(
            rest.parse()
                .map_err(|_| format!("invalid speed {rest:?}"))?,
        ),
        "volume" => {
            let volume: f32 = rest
                .parse()
                .map_err(|_| format!("invalid volume {rest:?}"))?;
            ShellCommand::Volume(volume.clamp(0.0, 1.0))
        }
        "next" => ShellCommand::NextPage,
        "prev" => ShellCommand::PrevPage,
        "status" => ShellCommand::Status,
        "voices" => ShellCommand::Voices,
        "help" | "" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command {other:?}; {HELP}")),
    };
    Ok(command)
}

/// Page cursor over the open document's pages.
#[derive(Debug, Default)]
pub struct PageView {
    index: usize,
}

impl PageView {
    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn next(&mut self, page_count: usize) -> bool {
        if self.index + 1 < page_count {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

pub fn render_page(pages: &[String], index: usize) -> Option<String> {
    let page = pages.get(index)?;
    Some(format!("-- Page {} of {} --\n{page}", index + 1, pages.len()))
}

/// Turns controller events into console output.
#[derive(Debug, Default)]
pub struct Renderer {
    maximum: usize,
}

impl Renderer {
    pub fn render(&mut self, event: &ReaderEvent) -> Option<String> {
        match event {
            ReaderEvent::DocumentLoaded {
                document_id,
                pages,
                sentence_count,
                progress,
            } => {
                self.maximum = *sentence_count;
                let first = render_page(pages, 0).unwrap_or_default();
                Some(format!(
                    "Opened {document_id}\n{first}\n{}",
                    self.progress_bar(*progress)
                ))
            }
            ReaderEvent::Highlight(sentence) => Some(format!(">> {sentence}")),
            ReaderEvent::ClearHighlight => None,
            ReaderEvent::Progress(value) => Some(self.progress_bar(*value)),
            ReaderEvent::RateChanged(rate) => Some(format!("Speed: {rate}")),
            ReaderEvent::VolumeChanged(volume) => Some(format!("Volume: {volume:.2}")),
            ReaderEvent::Finished => Some("Finished reading.".to_string()),
            ReaderEvent::SpeechFailed(message) => Some(format!("Speech failed: {message}")),
            ReaderEvent::Notice(message) => Some(format!("[!] {message}")),
        }
    }

    fn progress_bar(&self, value: usize) -> String {
        let value = value.min(self.maximum);
        let filled = if self.maximum == 0 {
            0
        } else {
            value * PROGRESS_WIDTH / self.maximum
        };
        format!(
            "[{}{}] {value}/{}",
            "#".repeat(filled),
            "-".repeat(PROGRESS_WIDTH - filled),
            self.maximum
        )
    }
}

fn spawn_renderer(events: Receiver<ReaderEvent>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("renderer".into()).spawn(move || {
        let mut renderer = Renderer::default();
        for event in events {
            if let Some(text) = renderer.render(&event) {
                println!("{text}");
            }
        }
    })
}

/// Runs the console until `quit` or end of input, then shuts the controller down.
pub fn run(state: AppState, events: Receiver<ReaderEvent>) -> Result<()> {
    spawn_renderer(events).context("failed to start renderer thread")?;
    println!("{HELP}");

    let mut pages = PageView::default();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read console input")?;
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        execute(&state, &mut pages, command);
        io::stdout().flush().ok();
    }

    info!("Closing reader");
    state.controller.shutdown();
    Ok(())
}

fn execute(state: &AppState, pages: &mut PageView, command: ShellCommand) {
    let controller = &state.controller;
    let outcome = match command {
        ShellCommand::Open(path) => {
            if state.open(&path) {
                pages.reset();
            }
            Ok(())
        }
        ShellCommand::Start => controller.start(),
        ShellCommand::Stop => controller.stop(),
        ShellCommand::Restart => controller.restart(),
        ShellCommand::Speed(rate) => {
            controller.set_rate(rate);
            Ok(())
        }
        ShellCommand::Volume(volume) => {
            controller.set_volume(volume);
            Ok(())
        }
        ShellCommand::NextPage | ShellCommand::PrevPage => {
            if let Some(document) = controller.document() {
                let moved = if command == ShellCommand::NextPage {
                    pages.next(document.pages().len())
                } else {
                    pages.prev()
                };
                if moved {
                    if let Some(text) = render_page(document.pages(), pages.index()) {
                        println!("{text}");
                    }
                }
            }
            Ok(())
        }
        ShellCommand::Status => {
            let position = controller.position();
            let settings = controller.settings();
            let state_name = match controller.state() {
                PlaybackState::Idle => "idle",
                PlaybackState::Reading => "reading",
            };
            println!(
                "{state_name} | {} | sentence {} word {} | speed {} volume {:.2}",
                controller.document_id().unwrap_or_else(|| "no book".into()),
                position.sentence,
                position.word,
                settings.rate,
                settings.volume
            );
            Ok(())
        }
        ShellCommand::Voices => {
            for voice in state.voice_list() {
                println!("{} ({})", voice.label, voice.model_path.display());
            }
            Ok(())
        }
        ShellCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ShellCommand::Quit => Ok(()),
    };
    if let Err(err) = outcome {
        state.notify(err.to_string());
    }
}
