use std::sync::{Arc, OnceLock};

/// Host-side sink for the connector's log records.
///
/// The host forwards each record to its own logging system. Install it once at
/// startup with [`set_logger`].
///
/// ## Kotlin
///
/// ```kotlin
/// object SmartKeyLogger : uniffi.smartkey.Logger {
///     override fun log(level: LogLevel, message: String) {
///         Log.println(level.toPriority(), "smartkey", message)
///     }
/// }
///
/// setLogger(SmartKeyLogger)
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very verbose diagnostics.
    Trace,
    /// Diagnostics useful while developing a host integration.
    Debug,
    /// Lifecycle events such as connect and disconnect.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failed operations.
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

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Bridges the `log` facade to the host's [`Logger`].
struct ForeignLogger;

impl ForeignLogger {
    /// Debug and trace records from dependencies are dropped; only this crate's
    /// own diagnostics go through at those levels.
    fn accepts(metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || metadata.target().starts_with("smartkey")
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::accepts(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !Self::accepts(record.metadata()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Installs the host logger. Only the first call has any effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("smartkey logger already set");
        return;
    }
    if let Err(e) = init_logger() {
        eprintln!("failed to install smartkey logger: {e}");
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
    fn test_filters_dependency_debug_records() {
        let own = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("smartkey_core::signer")
            .build();
        let dependency = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("tokio::runtime")
            .build();
        let dependency_warning = log::Metadata::builder()
            .level(log::Level::Warn)
            .target("tokio::runtime")
            .build();

        assert!(ForeignLogger::accepts(&own));
        assert!(!ForeignLogger::accepts(&dependency));
        assert!(ForeignLogger::accepts(&dependency_warning));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }
}
