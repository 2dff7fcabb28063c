//! Transport error types

use std::path::PathBuf;
use structclaude_protocol::ProtocolError;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur in transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No executable was found at any of the searched locations
    #[error("CLI executable not found (searched: {})", display_paths(.searched))]
    ExecutableNotFound {
        /// Every path that was checked, in order
        searched: Vec<PathBuf>,
    },

    /// The configured working directory does not exist
    #[error("Working directory not found: {}", .0.display())]
    WorkingDirectoryNotFound(PathBuf),

    /// The OS refused to start the process
    #[error("Failed to launch CLI process: {0}")]
    LaunchFailed(#[source] std::io::Error),

    /// `write` called before `connect` or after `close`
    #[error("Transport is not connected")]
    NotReady,

    /// Outbound message could not be encoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error on a pipe
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
