//! Transport trait
//!
//! The session drives any transport through this seam; the subprocess
//! implementation is [`crate::CliTransport`], tests substitute scripted ones.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use structclaude_protocol::UserInput;

/// Connection phase of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    /// `connect` has not succeeded yet
    Disconnected,

    /// Process running, pipes open
    Running,

    /// `close` has run; terminal
    Closed,
}

/// A bidirectional byte channel to an agent process
///
/// One outbound write path and one inbound, single-consumer sequence of
/// byte chunks. The chunk sequence ends when the process closes its output
/// or the transport is closed.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the process; a no-op while already running
    async fn connect(&self) -> Result<()>;

    /// Write one message as a newline-terminated JSON line
    ///
    /// Fails with [`crate::TransportError::NotReady`] unless running.
    async fn write(&self, message: &UserInput) -> Result<()>;

    /// Next chunk of output, or `None` once the sequence has ended
    async fn recv_chunk(&self) -> Option<Bytes>;

    /// Current phase
    async fn phase(&self) -> TransportPhase;

    /// Check if transport is connected
    async fn is_connected(&self) -> bool {
        self.phase().await == TransportPhase::Running
    }

    /// Exit code of the process, if it has exited and reported one
    async fn exit_code(&self) -> Option<i32>;

    /// Most recent stderr output, for diagnostics
    async fn stderr_tail(&self) -> String;

    /// Release everything; idempotent and safe from any phase
    async fn close(&self) -> Result<()>;
}
