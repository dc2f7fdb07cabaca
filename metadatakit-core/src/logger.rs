//! Forwarding of `log` records to a host-provided logger.

use std::sync::{Arc, OnceLock};

/// Sink for log records emitted by the metadata subsystem.
///
/// Exported via `UniFFI` so host apps can route records into their own logging.
///
/// ```rust
/// use metadatakit_core::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class MetadataKitLoggerBridge: MetadataKit.Logger {
///     func log(level: MetadataKit.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// MetadataKit.setLogger(logger: MetadataKitLoggerBridge()) // once, at startup
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information, e.g. bootstrap state transitions.
    Debug,
    /// Progress information.
    Info,
    /// Recoverable anomalies such as a legacy-key decrypt or a save retry.
    Warn,
    /// Failures.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Bridges the `log` facade to the registered [`Logger`].
struct ForeignLogger;

/// Debug and trace records from other crates (reqwest, hyper, ...) are dropped.
fn is_forwarded(level: log::Level, module_path: Option<&str>) -> bool {
    let is_verbose = matches!(level, log::Level::Debug | log::Level::Trace);
    !is_verbose || module_path.is_some_and(|path| path.starts_with("metadatakit"))
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        is_forwarded(metadata.level(), Some(metadata.target()))
    }

    fn log(&self, record: &log::Record) {
        if !is_forwarded(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Registers the host logger and installs the `log` bridge.
///
/// Only the first call has an effect; later calls are reported and ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_records_are_limited_to_this_crate() {
        assert!(is_forwarded(
            log::Level::Debug,
            Some("metadatakit_core::bootstrap")
        ));
        assert!(!is_forwarded(log::Level::Debug, Some("hyper::proto")));
        assert!(!is_forwarded(log::Level::Trace, None));
        assert!(is_forwarded(log::Level::Warn, Some("hyper::proto")));
        assert!(is_forwarded(log::Level::Error, None));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
