//! External dataset converter (`spacy convert` by default).
//!
//! # Responsibility
//! - Turn a JSON training batch into the downstream binary training format.
//!
//! # Invariants
//! - Success is defined solely by the converter's exit status.
//! - Invocation is blocking with no timeout; a hung converter hangs the caller.

use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::process::Command;
use std::time::Instant;

const MAX_STDERR_CHARS: usize = 400;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Debug)]
pub enum ConvertError {
    Spawn {
        program: String,
        source: std::io::Error,
    },
    Failed {
        code: Option<i32>,
        stderr: String,
    },
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, source } => {
                write!(f, "failed to start converter `{program}`: {source}")
            }
            Self::Failed { code, stderr } => match code {
                Some(code) => write!(f, "converter exited with status {code}: {stderr}"),
                None => write!(f, "converter terminated by signal: {stderr}"),
            },
        }
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Failed { .. } => None,
        }
    }
}

/// Converts one JSON batch file into `output_dir`.
pub trait Converter: Send + Sync {
    fn convert(&self, input: &Path, output_dir: &Path) -> ConvertResult<()>;
}

/// Runs `program args... <input> <output_dir>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    /// Builds a converter from `[program, args...]`; `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Converter for CommandConverter {
    fn convert(&self, input: &Path, output_dir: &Path) -> ConvertResult<()> {
        let started_at = Instant::now();
        info!(
            "event=convert module=convert status=start program={} input={}",
            self.program,
            input.display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output_dir)
            .output()
            .map_err(|err| ConvertError::Spawn {
                program: self.program.clone(),
                source: err,
            })?;

        if output.status.success() {
            info!(
                "event=convert module=convert status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr)
            .replace(['\n', '\r'], " ")
            .chars()
            .take(MAX_STDERR_CHARS)
            .collect::<String>();
        error!(
            "event=convert module=convert status=error duration_ms={} exit_code={:?} stderr={}",
            started_at.elapsed().as_millis(),
            output.status.code(),
            stderr
        );
        Err(ConvertError::Failed {
            code: output.status.code(),
            stderr,
        })
    }
}
