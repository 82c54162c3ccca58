//! Process-wide logging for the annotation server.
//!
//! # Responsibility
//! - Start one rolling file logger (`annotator*.log`) per process and mirror
//!   `info` and above to stderr.
//! - Record panics as structured events before the default hook runs.
//!
//! # Invariants
//! - Events carry identifiers and counts only; annotation payloads and source
//!   text stay out of the log.
//! - Calling `init_logging` again with the same level and directory is a no-op;
//!   any other configuration is a `Conflict`.
//! - Nothing here panics.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "annotator";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_MESSAGE_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Level and directory a logger was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LevelFilter,
    dir: PathBuf,
}

impl LogTarget {
    fn resolve(level: &str, dir: &Path) -> Result<Self, LoggingError> {
        let level = parse_level(level)?;
        if dir.as_os_str().is_empty() {
            return Err(LoggingError::EmptyDir);
        }
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|err| LoggingError::CreateDir {
                    dir: dir.to_path_buf(),
                    source: err,
                })?
                .join(dir)
        };
        Ok(Self { level, dir })
    }

    fn check_matches(&self, requested: &LogTarget) -> Result<(), LoggingError> {
        if self.dir != requested.dir {
            return Err(LoggingError::Conflict(format!(
                "logger already writes to `{}`; cannot move it to `{}`",
                self.dir.display(),
                requested.dir.display()
            )));
        }
        if self.level != requested.level {
            return Err(LoggingError::Conflict(format!(
                "logger already runs at `{}`; cannot change it to `{}`",
                self.level, requested.level
            )));
        }
        Ok(())
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyDir,
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(String),
    /// Already initialized with a different level or directory.
    Conflict(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDir => write!(f, "log directory cannot be empty"),
            Self::CreateDir { dir, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::Conflict(message) => write!(f, "{message}"),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Starts the file logger; relative `log_dir` resolves against the working
/// directory.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let requested = LogTarget::resolve(level, log_dir.as_ref())?;
    ACTIVE
        .get_or_try_init(|| start(requested.clone()))?
        .target
        .check_matches(&requested)
}

/// Level and absolute directory of the running logger, if any.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.target.level, active.target.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(target: LogTarget) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&target.dir).map_err(|err| LoggingError::CreateDir {
        dir: target.dir.clone(),
        source: err,
    })?;

    let handle = Logger::try_with_str(target.level.to_string().to_ascii_lowercase())
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .duplicate_to_stderr(Duplicate::Info)
        .format_for_files(flexi_logger::detailed_format)
        .format_for_stderr(flexi_logger::default_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    hook_panics();
    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} os={}",
        target.level,
        target.dir.display(),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

// Only reached from `start`, which the `ACTIVE` cell runs at most once.
fn hook_panics() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let message = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={} message={}",
            location,
            single_line(&message, PANIC_MESSAGE_LIMIT)
        );
        default_hook(panic);
    }));
}

/// Flattens `value` to one line of at most `limit` chars plus `...`.
fn single_line(value: &str, limit: usize) -> String {
    let mut chars = value.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c });
    let mut line: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        line.push_str("...");
    }
    line
}
