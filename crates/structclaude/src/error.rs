//! Error types for the Agent SDK
//!
//! Provides self-documenting errors with recovery guidance.
//! Errors implement `ErrorRecovery` which provides:
//! - Retry assessment (can a fresh attempt succeed?)
//! - Suggested user action (what should the user do?)
//!
//! Nothing in this crate retries on its own; callers decide whether to
//! start a fresh session.

use std::path::PathBuf;
use std::time::Duration;
use structclaude_protocol::ProtocolError;
use structclaude_transport::TransportError;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Install guidance shown when the CLI cannot be found
pub const INSTALL_HINT: &str = "Install the Claude Code CLI with `npm install -g @anthropic-ai/claude-code`, \
or point `SessionConfig::cli_path` at an existing executable.";

/// Error recovery guidance trait
///
/// Errors implement this trait to provide actionable recovery guidance.
pub trait ErrorRecovery {
    /// Whether retrying with a fresh session may succeed
    fn is_retriable(&self) -> bool;

    /// User-facing action to take
    fn suggested_action(&self) -> &str;
}

/// Errors that can occur in agent operations
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The CLI executable was not found anywhere it was looked for
    #[error("Claude CLI executable not found. {INSTALL_HINT} Searched: {}", display_paths(.searched))]
    ExecutableNotFound {
        /// Every path checked, in order
        searched: Vec<PathBuf>,
    },

    /// The configured working directory does not exist
    #[error("Working directory not found: {}", .0.display())]
    WorkingDirectoryNotFound(PathBuf),

    /// The OS failed to start the CLI
    #[error("Failed to launch Claude CLI: {0}")]
    ProcessLaunchFailed(#[source] std::io::Error),

    /// The output stream ended before a result was produced
    #[error("Claude CLI exited (code {code}) before producing a result{}", stderr_suffix(.stderr_tail))]
    ProcessExited {
        /// Exit code, `-1` when unknown
        code: i32,
        /// Last lines the CLI wrote to stderr
        stderr_tail: String,
    },

    /// A line could not be framed; also raised on buffer overflow
    #[error("Parse error: {cause} (line starts with {line_prefix:?})")]
    Parse {
        /// Leading characters of the offending line or buffer
        line_prefix: String,
        /// What went wrong
        cause: String,
    },

    /// Write attempted before connect or after close
    #[error("Session is not ready: connect before sending, and do not reuse a closed session")]
    SessionNotReady,

    /// The structured payload did not match the requested type
    #[error("Failed to decode structured output as {target}: {cause}")]
    OutputDecodingFailed {
        /// Requested Rust type
        target: &'static str,
        /// Decoder error
        #[source]
        cause: serde_json::Error,
    },

    /// `SessionConfig::response_timeout` elapsed
    #[error("No result within {0:?}")]
    Timeout(Duration),

    /// Outbound message could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error on a pipe
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(nothing)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn stderr_suffix(stderr_tail: &str) -> String {
    let tail = stderr_tail.trim();
    if tail.is_empty() {
        String::new()
    } else {
        format!("; stderr: {tail}")
    }
}

impl From<TransportError> for AgentError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ExecutableNotFound { searched } => Self::ExecutableNotFound { searched },
            TransportError::WorkingDirectoryNotFound(path) => Self::WorkingDirectoryNotFound(path),
            TransportError::LaunchFailed(e) => Self::ProcessLaunchFailed(e),
            TransportError::NotReady => Self::SessionNotReady,
            TransportError::Protocol(e) => Self::Protocol(e),
            TransportError::Io(e) => Self::Io(e),
        }
    }
}

impl ErrorRecovery for AgentError {
    fn is_retriable(&self) -> bool {
        match self {
            // The CLI died or stalled; a fresh session may fare better
            Self::ProcessExited { .. } | Self::Timeout(_) => true,

            // I/O errors might be transient (e.g., Interrupted)
            Self::Io(err) => err.kind() == std::io::ErrorKind::Interrupted,

            // Everything else needs a config, install, or type fix first
            _ => false,
        }
    }

    fn suggested_action(&self) -> &str {
        match self {
            Self::ExecutableNotFound { .. } => INSTALL_HINT,
            Self::WorkingDirectoryNotFound(_) => {
                "Create the working directory or fix `SessionConfig::working_dir`."
            }
            Self::ProcessLaunchFailed(err) => match err.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    "The CLI is not executable. Check its file permissions."
                }
                _ => "The CLI could not be started. Check the path and system resources.",
            },
            Self::ProcessExited { .. } => {
                "The CLI exited early. Check the stderr tail, the CLI arguments \
                and authentication, then start a new session."
            }
            Self::Parse { .. } => {
                "The CLI produced output that could not be framed. \
                Check for oversized lines and the CLI version."
            }
            Self::SessionNotReady => "Connect the session before sending, or create a new one.",
            Self::OutputDecodingFailed { .. } => {
                "The structured output does not match the requested type. \
                Align the JSON schema passed to the CLI with the Rust type."
            }
            Self::Timeout(_) => {
                "No result arrived in time. Raise `response_timeout` or simplify the prompt."
            }
            Self::Protocol(_) => "The request could not be encoded. Check the prompt contents.",
            Self::Io(err) => match err.kind() {
                std::io::ErrorKind::BrokenPipe => {
                    "The CLI closed its input. Start a new session."
                }
                std::io::ErrorKind::Interrupted => "I/O operation interrupted. Try again.",
                _ => "I/O error occurred talking to the CLI. Check process health.",
            },
        }
    }
}
