//! Entity extraction passthrough to an external recognizer.
//!
//! The recognizer is an external model process; this module only moves text
//! in and its JSON answer out.

use log::{error, info};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::time::Instant;

pub type NerResult<T> = Result<T, NerError>;

#[derive(Debug)]
pub enum NerError {
    Io(std::io::Error),
    Failed { code: Option<i32> },
}

impl Display for NerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "entity recognizer i/o failed: {err}"),
            Self::Failed { code } => write!(f, "entity recognizer exited with status {code:?}"),
        }
    }
}

impl Error for NerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Failed { .. } => None,
        }
    }
}

impl From<std::io::Error> for NerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Named-entity recognizer returning model output for raw text.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> NerResult<Value>;
}

/// Pipes text to a command's stdin and returns its stdout.
///
/// JSON stdout is returned as parsed JSON; anything else as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl EntityRecognizer for CommandRecognizer {
    fn recognize(&self, text: &str) -> NerResult<Value> {
        let started_at = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // stdin must be fed while stdout drains; a full pipe stalls both sides.
        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || feed_stdin(stdin, text));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            written.and(output)
        })?;

        if !output.status.success() {
            error!(
                "event=ner module=ner status=error duration_ms={} exit_code={:?}",
                started_at.elapsed().as_millis(),
                output.status.code()
            );
            return Err(NerError::Failed {
                code: output.status.code(),
            });
        }

        info!(
            "event=ner module=ner status=ok duration_ms={} text_chars={}",
            started_at.elapsed().as_millis(),
            text.chars().count()
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(serde_json::from_str(&stdout)
            .unwrap_or_else(|_| Value::String(stdout.trim_end().to_string())))
    }
}

/// Writes `text` and closes the pipe; a child that exits without reading
/// everything is judged by its exit status, not by the broken pipe.
fn feed_stdin(stdin: Option<ChildStdin>, text: &str) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(text.as_bytes()) {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
