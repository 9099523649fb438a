//! Tracing setup for processes hosting ring nodes.
//!
//! Ring events are emitted with `tracing`. [init_logging] sends them to stderr and
//! routes `log` records and panics through the same subscriber.
use std::panic::PanicInfo;

use backtrace::Backtrace;
use clap::ValueEnum;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::error::Error;

/// Most verbose level written by [init_logging].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = Error;

    /// Case insensitive, same names as on the command line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| Error::InvalidLoggingLevel(s.to_string()))
    }
}

fn log_panic(info: &PanicInfo) {
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_default();
    tracing::error!(%location, "{}\n{:?}", info, Backtrace::new());
}

/// Record panics, with their backtrace, as `ERROR` events.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(log_panic));
}

/// Install the global subscriber writing events up to `level` to stderr.
///
/// Returns false if a global subscriber was already installed, which is then kept.
/// The panic hook is only set along with the first subscriber.
pub fn init_logging(level: LogLevel) -> bool {
    let _ = LogTracer::init();
    let subscriber = Registry::default().with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(LevelFilter::from(level)),
    );
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    set_panic_hook();
    tracing::debug!("logging up to {:?}", level);
    true
}
