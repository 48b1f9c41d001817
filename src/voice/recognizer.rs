use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use shlex::Shlex;
use thiserror::Error;

/// Exit status a recognizer helper uses to report that nobody spoke.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Extra time granted to the helper process beyond its own listen window.
const GRACE: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("no speech before the listen timeout")]
    Timeout,
    #[error("speech was not intelligible")]
    Unintelligible,
    #[error("recognition service failed: {0}")]
    Service(String),
}

pub trait Recognizer: Send {
    /// Blocks until a phrase is recognized or `timeout` passes without speech.
    fn listen(&mut self, timeout: Duration, phrase_limit: Duration)
        -> Result<String, RecognitionError>;
}

/// Runs an external speech-to-text helper once per listen.
///
/// The helper gets `--timeout <secs> --phrase-limit <secs>` appended and must
/// print the recognized phrase on stdout. Exit status [`TIMEOUT_EXIT_CODE`]
/// means no speech; empty output means unintelligible audio.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn from_command_line(raw: &str) -> Result<Self, RecognitionError> {
        let mut parts: Vec<String> = Shlex::new(raw).collect();
        if parts.is_empty() {
            return Err(RecognitionError::Service(
                "READER_STT_COMMAND is empty".to_string(),
            ));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }

    fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<i32, RecognitionError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code().unwrap_or(-1)),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RecognitionError::Timeout);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => return Err(RecognitionError::Service(err.to_string())),
            }
        }
    }
}

impl Recognizer for CommandRecognizer {
    fn listen(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<String, RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--timeout")
            .arg(timeout.as_secs().to_string())
            .arg("--phrase-limit")
            .arg(phrase_limit.as_secs().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| RecognitionError::Service(format!("failed to launch recognizer: {err}")))?;

        // Drain both pipes while waiting so a chatty helper cannot fill them and stall.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout + phrase_limit + GRACE;
        let code = Self::wait_with_deadline(&mut child, deadline)?;

        let stdout = collect(stdout)?;
        let stderr = collect(stderr).unwrap_or_default();

        match code {
            0 => {
                let phrase = stdout.trim();
                if phrase.is_empty() {
                    Err(RecognitionError::Unintelligible)
                } else {
                    Ok(phrase.to_string())
                }
            }
            TIMEOUT_EXIT_CODE => Err(RecognitionError::Timeout),
            code => Err(RecognitionError::Service(format!(
                "recognizer exited with status {code}: {}",
                stderr.trim()
            ))),
        }
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut text = String::new();
        pipe.read_to_string(&mut text)?;
        Ok(text)
    })
}

fn collect(
    reader: Option<JoinHandle<std::io::Result<String>>>,
) -> Result<String, RecognitionError> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    match reader.join() {
        Ok(result) => result.map_err(|err| RecognitionError::Service(err.to_string())),
        Err(_) => Err(RecognitionError::Service("recognizer output reader panicked".to_string())),
    }
}
