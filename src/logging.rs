//! Tracing setup for the server and the offline CLI.
//!
//! Both entry points share one filter builder: `RUST_LOG` wins, otherwise a per-binary default
//! level applies. The server logs compactly to stdout and appends to a log file
//! (`ASKFILES_LOG_FILE`, or `logs/askfiles.log`) through a non-blocking writer. The CLI logs
//! to stderr only, so stdout carries nothing but extracted text.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "ASKFILES_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/askfiles.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the server subscriber: stdout plus the log file when it can be opened.
pub fn init_tracing() {
    let file_layer = file_writer(&log_file_path()).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();
}

/// Install the CLI subscriber on stderr; `verbose` lowers the default level to `debug`.
pub fn init_cli_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(cli_level(verbose)))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn cli_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn log_file_path() -> PathBuf {
    std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

/// Non-blocking writer over `path`; the worker guard lives for the rest of the process.
///
/// Tracing is not installed yet when this runs, so failures go to stderr and file logging is
/// skipped.
fn file_writer(path: &Path) -> Option<NonBlocking> {
    match open_append(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("File logging disabled, cannot open {}: {err}", path.display());
            None
        }
    }
}

/// Open `path` for appending, creating missing parent directories.
fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
