//! Tracing subscriber setup.
//!
//! Log output goes to stderr (and optionally a file) behind a reloadable
//! filter so the `debug n` command can change verbosity at runtime.
//!
//! | Level | Filter |
//! |-------|--------|
//! | 0 | error |
//! | 1 | info |
//! | 2 | debug |
//! | 3+ | trace |

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::error::{Result, TelloError};

/// Filter directive for an operator debug level.
///
/// # Examples
///
/// ```
/// use tello_console::logging::level_filter;
///
/// assert_eq!(level_filter(0), "error");
/// assert_eq!(level_filter(2), "debug");
/// assert_eq!(level_filter(9), "trace");
/// ```
#[must_use]
pub fn level_filter(level: u8) -> &'static str {
    match level {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Changes the active log filter.
#[derive(Clone)]
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl std::fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLevelHandle").finish_non_exhaustive()
    }
}

impl LogLevelHandle {
    /// Switch to the filter for `level`.
    ///
    /// # Errors
    ///
    /// Fails if the subscriber holding the filter has been dropped.
    pub fn set_level(&self, level: u8) -> Result<()> {
        self.handle
            .reload(EnvFilter::new(level_filter(level)))
            .map_err(|e| TelloError::InvalidArgument {
                command: "debug",
                reason: e.to_string(),
            })
    }
}

/// Keeps logging alive; drop it last.
pub struct LoggingGuard {
    pub level: LogLevelHandle,
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level at startup.
///
/// # Errors
///
/// Returns an error if `config.file` has no file name or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let initial = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_filter(config.level)));
    let (filter, handle) = reload::Layer::new(initial);

    let (file_layer, file_guard) = match &config.file {
        Some(file) => {
            let path = Path::new(file);
            let file_name = path.file_name().ok_or_else(|| TelloError::InvalidArgument {
                command: "logging.file",
                reason: format!("'{}' is not a file path", path.display()),
            })?;
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| TelloError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

    Ok(LoggingGuard {
        level: LogLevelHandle { handle },
        _file: file_guard,
    })
}
