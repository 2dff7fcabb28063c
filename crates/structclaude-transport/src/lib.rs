//! Subprocess transport for the Claude CLI
//!
//! Spawns the CLI with piped stdio, writes stream-json input lines to its
//! stdin and exposes its stdout as a lazily produced sequence of byte chunks.
//!
//! # Architecture
//!
//! - **Transport trait**: [`Transport`], the seam the session is generic over
//! - **CLI transport**: [`CliTransport`], a `Disconnected -> Running -> Closed` state machine

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! - **Discovery**: [`subprocess::discovery`], executable lookup over `PATH` and known install locations
//! - **Error handling**: [`TransportError`]
//!
//! # Usage
//!
//! ```no_run
//! use structclaude_transport::{CliTransport, ProcessConfig, Transport};
//! use structclaude_protocol::UserInput;
//!
//! # async fn example() -> structclaude_transport::Result<()> {
//! let transport = CliTransport::new(ProcessConfig::new("claude").with_arg("--print"));
//! transport.connect().await?;
//! transport.write(&UserInput::new("hello")).await?;
//! while let Some(chunk) = transport.recv_chunk().await {
//!     println!("{} bytes", chunk.len());
//! }
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod subprocess;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use subprocess::{CliTransport, ProcessConfig};
pub use traits::{Transport, TransportPhase};
