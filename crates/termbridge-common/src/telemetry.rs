//! Tracing setup for hosts embedding the bridge.
//!
//! The bridge only emits `tracing` events; installing a subscriber is left to
//! the host. `init_tracing` is the default wiring, controlled by:
//!
//! - `RUST_LOG`: filter directives (falls back to `default_level`)
//! - `TERMBRIDGE_LOG`: append logs to this file instead of a stream
//! - `TERMBRIDGE_LOG_FORMAT`: `text` (default) or `json`
//! - `TERMBRIDGE_LOG_STREAM`: `stderr` (default) or `stdout`

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_ENV: &str = "TERMBRIDGE_LOG";
pub const LOG_FORMAT_ENV: &str = "TERMBRIDGE_LOG_FORMAT";
pub const LOG_STREAM_ENV: &str = "TERMBRIDGE_LOG_STREAM";

/// Keeps the non-blocking file writer alive. Drop it on shutdown to flush.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    fn disabled() -> Self {
        Self { _guard: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogStream {
    Stderr,
    Stdout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub stream: LogStream,
    pub file: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var(LOG_FORMAT_ENV).ok().as_deref(),
            std::env::var(LOG_STREAM_ENV).ok().as_deref(),
            std::env::var(LOG_FILE_ENV).ok().as_deref(),
        )
    }

    fn parse(format: Option<&str>, stream: Option<&str>, file: Option<&str>) -> Self {
        let format = match normalized(format).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let stream = match normalized(stream).as_deref() {
            Some("stdout") => LogStream::Stdout,
            _ => LogStream::Stderr,
        };
        let file = file
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        Self {
            format,
            stream,
            file,
        }
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase())
}

/// Installs a global subscriber. Returns a disabled guard if one is already set.
pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let config = LogConfig::from_env();

    let (writer, guard, ansi) = match config.file.as_ref() {
        Some(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(_) => stream_writer(LogStream::Stderr),
        },
        None => stream_writer(config.stream),
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match config.format {
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(writer)
                .finish(),
        ),
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(ansi)
                .with_writer(writer)
                .finish(),
        ),
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return TelemetryGuard::disabled();
    }

    if let Some(path) = config.file.as_ref() {
        if guard.is_none() {
            tracing::warn!(path = %path.display(), "Failed to open log file; logging to stderr");
        }
    }

    TelemetryGuard { _guard: guard }
}

fn stream_writer(stream: LogStream) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
    match stream {
        LogStream::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            None,
            std::io::stdout().is_terminal(),
        ),
        LogStream::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            None,
            std::io::stderr().is_terminal(),
        ),
    }
}
