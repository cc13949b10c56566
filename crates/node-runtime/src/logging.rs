//! # Logging
//!
//! Installs the global `tracing` subscriber with a reloadable filter so the
//! configured debug level can be applied after startup.
//!
//! Accepted levels: `trace`, `debug`, `info`, `warn`, `error`, `critical`
//! (treated as `error`) and `off`, either alone or as comma separated
//! `target=level` directives such as `info,peer_discovery=debug`.

use std::io::Write;

use parking_lot::Mutex;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub const DEFAULT_LOG_LEVEL: &str = "info";

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "critical", "off"];

/// Logging setup errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid debug level `{level}`: {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("failed to install log subscriber: {0}")]
    Install(String),

    #[error("failed to apply log filter: {0}")]
    Reload(String),
}

/// Applies a debug level to the running subscriber.
pub trait LevelControl: Send + Sync {
    fn set_level(&self, level: &str) -> Result<(), LoggingError>;
}

fn normalize_level(level: &str) -> Option<&'static str> {
    let lower = level.trim().to_ascii_lowercase();
    match lower.as_str() {
        "critical" => Some("error"),
        other => LEVELS.iter().find(|l| **l == other).copied(),
    }
}

/// Translate a debug level into `EnvFilter` directives.
pub fn parse_directives(level: &str) -> Result<String, LoggingError> {
    let invalid = |reason: &str| LoggingError::InvalidLevel {
        level: level.to_string(),
        reason: reason.to_string(),
    };

    if level.trim().is_empty() {
        return Err(invalid("empty"));
    }

    let mut directives = Vec::new();
    for part in level.split(',') {
        let directive = match part.split_once('=') {
            Some((target, lvl)) => {
                let target = target.trim();
                if target.is_empty() {
                    return Err(invalid("missing target before `=`"));
                }
                let lvl = normalize_level(lvl).ok_or_else(|| invalid("unknown level"))?;
                format!("{}={}", target, lvl)
            }
            None => normalize_level(part)
                .ok_or_else(|| invalid("unknown level"))?
                .to_string(),
        };
        directives.push(directive);
    }
    Ok(directives.join(","))
}

/// Build a filter from a debug level.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = parse_directives(level)?;
    EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidLevel {
        level: level.to_string(),
        reason: e.to_string(),
    })
}

/// Handle to the installed subscriber's filter.
pub struct LoggingHandle {
    reload: reload::Handle<EnvFilter, Registry>,
    current: Mutex<String>,
}

impl LevelControl for LoggingHandle {
    fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        let directives = parse_directives(level)?;
        let mut current = self.current.lock();
        if *current == directives {
            return Ok(());
        }
        self.reload
            .reload(build_filter(level)?)
            .map_err(|e| LoggingError::Reload(e.to_string()))?;
        tracing::debug!(level = %directives, "Log level applied");
        *current = directives;
        Ok(())
    }
}

/// Keeps logging alive; flushes output when dropped.
pub struct LogGuard {
    _private: (),
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::debug!("Flushing logs");
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Install the global subscriber at `level`.
///
/// Hold the returned guard for the lifetime of the process.
pub fn init(level: &str) -> Result<(LoggingHandle, LogGuard), LoggingError> {
    let directives = parse_directives(level)?;
    let (filter, reload) = reload::Layer::new(build_filter(level)?);

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok((
        LoggingHandle {
            reload,
            current: Mutex::new(directives),
        },
        LogGuard { _private: () },
    ))
}
