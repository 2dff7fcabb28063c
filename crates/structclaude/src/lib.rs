//! Structured-output sessions with the Claude Code CLI
//!
//! This crate launches the Claude Code CLI in stream-json mode, sends it a
//! prompt, and decodes the `structured_output` of the first successful
//! result into a Rust type.
//!
//! # Architecture
//!
//! The SDK is built on three layers:
//!
//! 1. **Protocol Layer** (`structclaude-protocol`): JSON values and wire messages

#![deny(unsafe_code)]
//! 2. **Transport Layer** (`structclaude-transport`): Subprocess lifecycle and pipes
//! 3. **Session Layer** (this crate): Line framing, typed responses, teardown
//!
//! # Usage Example
//!
//! ```no_run
//! use serde::Deserialize;
//! use structclaude::{AgentSession, SessionConfig};
//!
//! #[derive(Debug, Deserialize)]
//! struct Verdict {
//!     approved: bool,
//!     reason: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::new().with_json_schema(serde_json::json!({
//!         "type": "object",
//!         "properties": {
//!             "approved": {"type": "boolean"},
//!             "reason": {"type": "string"}
//!         },
//!         "required": ["approved", "reason"]
//!     }));
//!
//!     let session = AgentSession::connect(config).await?;
//!     let verdict: Verdict = session.respond("Should we ship on Friday?").await?;
//!     println!("{verdict:?}");
//!
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! The Claude Code CLI must be installed (`npm install -g @anthropic-ai/claude-code`)
//! or reachable through [`SessionConfig::cli_path`].

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod framer;
pub mod log;
pub mod session;
pub mod testing;

// Re-export commonly used types
pub use config::{DEFAULT_CLI_ARGS, SessionConfig, TEARDOWN_TIMEOUT};
pub use error::{AgentError, ErrorRecovery, INSTALL_HINT, Result};
pub use framer::{LineFramer, MAX_BUFFER_BYTES};
pub use log::{LogLevel, LogSink, discard_sink, tracing_sink};
pub use session::{AgentSession, SessionState};

// Re-export lower layers
pub use structclaude_protocol::{AgentMessage, JsonNumber, JsonValue, ResultMessage, UserInput};
pub use structclaude_transport::{
    CliTransport, ProcessConfig, Transport, TransportError, TransportPhase,
};
