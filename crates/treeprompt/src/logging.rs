//! Process-wide diagnostics: a timestamped log file plus stderr.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, TimeZone};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::output::format_timestamp;

/// Why logging could not be set up.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("cannot create log directory {}", path.display())]
    #[diagnostic(code(treeprompt::logging::create_dir))]
    CreateDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The log file could not be opened.
    #[error("cannot create log file {}", path.display())]
    #[diagnostic(code(treeprompt::logging::create_file))]
    CreateFile {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed.
    #[error("logging is already initialised")]
    #[diagnostic(code(treeprompt::logging::already_initialized))]
    AlreadyInitialized,
}

/// Set once a session has claimed the global subscriber.
static INSTALLED: AtomicBool = AtomicBool::new(false);

/// `log_{YYYYMMDD_HHMMSS}.log`
#[must_use]
pub fn log_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("log_{}.log", format_timestamp(at))
}

/// The installed logging configuration for this process.
///
/// Every event at the active level goes to the log file.  Stderr only
/// shows warnings and errors unless `verbose` is set, so the interactive
/// transcript stays readable.
#[derive(Debug)]
pub struct LogSession {
    path: PathBuf,
}

impl LogSession {
    /// Create `dir` if needed, open a log file named after the current
    /// time and install the global subscriber.
    ///
    /// The default level is `info` (`debug` with `verbose`); `RUST_LOG`
    /// overrides both.  A second call fails with
    /// [`LoggingError::AlreadyInitialized`] before touching the filesystem,
    /// and an existing file of the same name is appended to, never
    /// truncated.
    pub fn init(dir: &Path, verbose: bool) -> Result<Self, LoggingError> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(LoggingError::AlreadyInitialized);
        }
        let (path, file) = match open_log_file(dir) {
            Ok(opened) => opened,
            Err(e) => {
                INSTALLED.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let default_level = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let console_level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        };

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_filter(console_level),
            )
            .with(filter)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        tracing::info!(path = %path.display(), "logging initialised");
        Ok(Self { path })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_log_file(dir: &Path) -> Result<(PathBuf, File), LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(log_file_name(&Local::now()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::CreateFile {
            path: path.clone(),
            source,
        })?;
    Ok((path, file))
}
