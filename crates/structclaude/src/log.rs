//! Diagnostic log sink
//!
//! Every complete line the CLI writes to stdout is handed to the session's
//! [`LogSink`] before it is parsed. The default sink forwards to `tracing`.

use std::sync::Arc;

/// Severity attached to a sink message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Raw protocol traffic
    Debug,
    /// Lifecycle events
    Info,
    /// Recoverable oddities
    Warning,
    /// Failures
    Error,
}

/// Callback receiving diagnostic text
pub type LogSink = Arc<dyn Fn(&str, LogLevel) + Send + Sync>;

/// Sink that forwards to `tracing` under the `structclaude::cli` target
pub fn tracing_sink() -> LogSink {
    Arc::new(|text: &str, level: LogLevel| match level {
        LogLevel::Debug => tracing::debug!(target: "structclaude::cli", "{text}"),
        LogLevel::Info => tracing::info!(target: "structclaude::cli", "{text}"),
        LogLevel::Warning => tracing::warn!(target: "structclaude::cli", "{text}"),
        LogLevel::Error => tracing::error!(target: "structclaude::cli", "{text}"),
    })
}

/// Sink that drops everything
pub fn discard_sink() -> LogSink {
    Arc::new(|_: &str, _: LogLevel| {})
}
